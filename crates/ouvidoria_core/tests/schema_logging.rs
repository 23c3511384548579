use ouvidoria_core::db::open_db_in_memory;
use ouvidoria_core::{flush_logging, init_logging, LoggingConfig};
use std::fs;
use std::path::Path;

fn read_logs(dir: &Path) -> String {
    let mut contents = String::new();
    for entry in fs::read_dir(dir).unwrap() {
        let path = entry.unwrap().path();
        if path.is_file() {
            contents.push_str(&fs::read_to_string(path).unwrap());
        }
    }
    contents
}

#[test]
fn empty_schema_script_logs_warning_with_resolved_path() {
    let log_dir = tempfile::tempdir().unwrap();
    init_logging(&LoggingConfig {
        level: "info".to_string(),
        log_dir: Some(log_dir.path().to_path_buf()),
    })
    .unwrap();

    let script = tempfile::NamedTempFile::new().unwrap();
    let db = open_db_in_memory().unwrap();
    assert_eq!(db.create_schema_from_script(Some(script.path())).unwrap(), 0);
    flush_logging();

    let logs = read_logs(log_dir.path());
    let warning = logs
        .lines()
        .find(|line| line.contains("event=schema_load") && line.contains("reason=empty_script"))
        .expect("empty script warning should be logged");
    assert!(warning.contains("WARN"));
    assert!(warning.contains(&script.path().display().to_string()));
}
