//! Use-case services over the persistence layer.
//!
//! # Responsibility
//! - Wrap record, factory and collector calls into units of work.
//! - Keep callers (CLI, web glue) away from commit/rollback handling.

pub mod record_service;

pub use record_service::RecordService;
