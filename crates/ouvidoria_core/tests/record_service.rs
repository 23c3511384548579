use ouvidoria_core::db::{open_db_in_memory, NamedParams, QueryExecutor, RowMap};
use ouvidoria_core::model::{Cargo, Localidade, Telefone};
use ouvidoria_core::{
    Filter, ObjectFactory, Predicate, RecordService, RecordState, RepoError,
};
use rusqlite::types::Value;

fn setup() -> QueryExecutor {
    let db = open_db_in_memory().unwrap();
    db.create_schema_from_script(None).unwrap();
    db
}

fn row(pairs: &[(&str, Value)]) -> RowMap {
    pairs
        .iter()
        .map(|(key, value)| (key.to_string(), value.clone()))
        .collect()
}

fn text(value: &str) -> Value {
    Value::Text(value.to_string())
}

fn cargo_data(nome: &str) -> RowMap {
    row(&[("nome", text(nome)), ("descricao", Value::Null)])
}

#[test]
fn create_commits_and_returns_persisted_record() {
    let db = setup();
    let service = RecordService::new(&db);

    let created = service.create("cargo", &cargo_data("Manager")).unwrap();
    assert_eq!(created.state(), RecordState::Persisted);
    assert!(!db.has_pending_writes());

    let cargo = created.downcast::<Cargo>().unwrap();
    let key = cargo.cod_cargo.unwrap();
    let fetched = service.get_by_id("cargo", key).unwrap().unwrap();
    assert_eq!(
        fetched.downcast_ref::<Cargo>().unwrap().entity(),
        cargo.entity()
    );
}

#[test]
fn get_by_id_returns_none_for_absent_key() {
    let db = setup();
    let service = RecordService::new(&db);
    assert!(service.get_by_id("localidade", 42).unwrap().is_none());
}

#[test]
fn list_is_ordered_by_primary_key() {
    let db = setup();
    let service = RecordService::new(&db);
    for nome in ["Clerk", "Analyst", "Manager"] {
        service.create("cargo", &cargo_data(nome)).unwrap();
    }

    let keys: Vec<i64> = service
        .list("CARGO")
        .unwrap()
        .into_iter()
        .map(|record| record.downcast::<Cargo>().unwrap().cod_cargo.unwrap())
        .collect();
    assert_eq!(keys.len(), 3);
    assert!(keys.windows(2).all(|pair| pair[0] < pair[1]));
}

#[test]
fn save_and_remove_commit_their_changes() {
    let db = setup();
    let service = RecordService::new(&db);
    let mut record = service
        .create(
            "localidade",
            &row(&[("estado", text("DF")), ("municipio", text("Brasilia"))]),
        )
        .unwrap();
    let key = record.key_values()[0].1.clone();

    record.downcast_mut::<Localidade>().unwrap().bairro = Some("Lago Sul".into());
    service.save(&mut record).unwrap();
    assert!(!db.has_pending_writes());

    let fetched = service.get_by_id("localidade", key.clone()).unwrap().unwrap();
    assert_eq!(
        fetched.to_row().get("bairro"),
        Some(&text("Lago Sul"))
    );

    service.remove(&mut record).unwrap();
    assert_eq!(record.state(), RecordState::Deleted);
    assert!(service.get_by_id("localidade", key).unwrap().is_none());
}

#[test]
fn failed_create_rolls_back() {
    let db = setup();
    let service = RecordService::new(&db);

    let err = service
        .create(
            "telefone",
            &row(&[
                ("telefone", text("99999-0000")),
                ("cod_morador", Value::Integer(404)),
                ("DDD", text("61")),
            ]),
        )
        .unwrap_err();
    assert!(matches!(err, RepoError::Db(_)));
    assert!(!db.has_pending_writes());
    assert!(service.get_by_id("telefone", "99999-0000".to_string()).unwrap().is_none());
}

#[test]
fn natural_key_lookup_and_find() {
    let db = setup();
    let service = RecordService::new(&db);
    let morador = service
        .create(
            "morador",
            &row(&[("cpf", text("11122233344")), ("data_nasc", text("1990-05-17"))]),
        )
        .unwrap();
    let cod_morador = morador.key_values()[0].1.clone();

    service
        .create(
            "telefone",
            &row(&[
                ("telefone", text("99999-0000")),
                ("cod_morador", cod_morador.clone()),
                ("DDD", text("61")),
            ]),
        )
        .unwrap();

    let telefone = service
        .get_by_id("telefone", "99999-0000".to_string())
        .unwrap()
        .unwrap()
        .downcast::<Telefone>()
        .unwrap();
    assert_eq!(telefone.ddd, "61");

    let found = service
        .find(
            &Filter::new(
                "telefone",
                vec![Predicate::equal_to("cod_morador", cod_morador)],
            )
            .unwrap(),
        )
        .unwrap();
    assert_eq!(found.len(), 1);
}

#[test]
fn unknown_type_is_rejected_by_every_operation() {
    let db = setup();
    let service = RecordService::new(&db);

    assert!(matches!(
        service.create("unknown", &RowMap::new()),
        Err(RepoError::UnknownEntityType(name)) if name == "unknown"
    ));
    assert!(matches!(
        service.get_by_id("unknown", 1),
        Err(RepoError::UnknownEntityType(_))
    ));
    assert!(matches!(
        service.list("unknown"),
        Err(RepoError::UnknownEntityType(_))
    ));
}

/// CARGO rows point at LOCALIDADE 1 through a foreign key checked only at
/// commit, so the statements succeed and `commit()` is what fails.
fn deferred_fk_db() -> QueryExecutor {
    let db = open_db_in_memory().unwrap();
    for sql in [
        "CREATE TABLE LOCALIDADE (cod_local INTEGER PRIMARY KEY AUTOINCREMENT, \
         estado TEXT NOT NULL, municipio TEXT NOT NULL, bairro TEXT, endereco TEXT)",
        "CREATE TABLE CARGO (cod_cargo INTEGER PRIMARY KEY AUTOINCREMENT, \
         nome TEXT NOT NULL, descricao TEXT, cod_local INTEGER DEFAULT 1 \
         REFERENCES LOCALIDADE (cod_local) DEFERRABLE INITIALLY DEFERRED)",
    ] {
        db.write(sql, &NamedParams::new()).unwrap();
    }
    db.commit().unwrap();
    db
}

#[test]
fn failed_commit_restores_the_record_state() {
    let db = deferred_fk_db();
    let service = RecordService::new(&db);

    let mut cargo = ObjectFactory::default()
        .create_instance("cargo", &cargo_data("Clerk"), &db, false)
        .unwrap();
    let err = service.save(&mut cargo).unwrap_err();
    assert!(matches!(err, RepoError::Db(_)));
    assert_eq!(cargo.state(), RecordState::Transient);
    assert_eq!(cargo.downcast_ref::<Cargo>().unwrap().cod_cargo, None);
    assert!(!db.has_pending_writes());
    assert!(service.list("cargo").unwrap().is_empty());

    let mut localidade = service
        .create(
            "localidade",
            &row(&[("estado", text("DF")), ("municipio", text("Brasilia"))]),
        )
        .unwrap();
    service.save(&mut cargo).unwrap();
    assert_eq!(cargo.state(), RecordState::Persisted);

    let key = localidade.key_values()[0].1.clone();
    assert!(service.remove(&mut localidade).is_err());
    assert_eq!(localidade.state(), RecordState::Persisted);
    assert_eq!(localidade.key_values()[0].1, key);
    assert!(service.get_by_id("localidade", key).unwrap().is_some());
}
