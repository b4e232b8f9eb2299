mod common;

use std::fs;
use std::sync::Arc;

use common::{RecordingObserver, ScriptedConnection};
use sql_map::prelude::*;
use tempfile::tempdir;

#[test]
fn options_from_json_use_defaults() {
    let opts = SqlMapOptions::from_json(r#"{ "template_root": "/srv/sql" }"#).unwrap();
    assert_eq!(opts.template_root, std::path::PathBuf::from("/srv/sql"));
    assert_eq!(opts.default_isolation_level, IsolationLevel::ReadCommitted);
    assert!(opts.trim_blocks);

    let opts = SqlMapOptions::from_json(
        r#"{ "template_root": "sql", "default_isolation_level": "repeatable-read", "trim_blocks": false }"#,
    )
    .unwrap();
    assert_eq!(opts.default_isolation_level, IsolationLevel::RepeatableRead);
    assert!(!opts.trim_blocks);
}

#[test]
fn bad_options_are_config_errors() {
    let missing_root = SqlMapOptions::from_json("{}").unwrap_err();
    assert_eq!(missing_root.kind(), ErrorKind::Config);
    let bad_level =
        SqlMapOptions::from_json(r#"{ "template_root": "sql", "default_isolation_level": "chaos" }"#)
            .unwrap_err();
    assert_eq!(bad_level.kind(), ErrorKind::Config);
}

#[test]
fn isolation_levels_parse_loosely() {
    assert_eq!("serializable".parse::<IsolationLevel>().unwrap(), IsolationLevel::Serializable);
    assert_eq!("READ COMMITTED".parse::<IsolationLevel>().unwrap(), IsolationLevel::ReadCommitted);
    assert_eq!("read_uncommitted".parse::<IsolationLevel>().unwrap(), IsolationLevel::ReadUncommitted);
    assert_eq!("autocommit".parse::<IsolationLevel>().unwrap(), IsolationLevel::Autocommit);
    assert_eq!(
        "whatever".parse::<IsolationLevel>().unwrap_err().kind(),
        ErrorKind::Config
    );
    assert_eq!(IsolationLevel::RepeatableRead.to_string(), "REPEATABLE READ");
}

#[test]
fn builder_sets_default_isolation_and_observer() {
    let observer = Arc::new(RecordingObserver::default());
    let conn = ScriptedConnection::new();
    let log = conn.log.clone();
    let mut map = SqlMap::<ScriptedConnection>::builder(common::template_root())
        .isolation_level(IsolationLevel::Serializable)
        .observer(observer.clone())
        .build(conn);

    map.simple_direct_select("SELECT 1", &SqlParams::new()).unwrap();
    assert!(log.lock().unwrap().contains(&"isolation SERIALIZABLE".to_owned()));
    assert_eq!(observer.seen.lock().unwrap().len(), 1);
}

#[test]
fn detached_map_reports_null_connection_until_attached() {
    let opts = SqlMapOptions::new(common::template_root());
    let mut map: SqlMap<ScriptedConnection> = SqlMap::from_options(None, &opts);
    assert!(matches!(
        map.simple_direct_select("SELECT 1", &SqlParams::new()),
        Err(SqlMapError::NullConnection)
    ));
    map.attach(ScriptedConnection::new()).unwrap();
    assert!(map.simple_direct_select("SELECT 1", &SqlParams::new()).is_ok());
}

#[test]
fn templates_load_from_any_root() {
    let dir = tempdir().expect("tempdir");
    fs::write(
        dir.path().join("pick.sql"),
        "SELECT {% if label is not_empty %}'{{ label }}'{% else %}'none'{% endif %} AS label\n",
    )
    .expect("write template");
    let renderer = TemplateRenderer::new(dir.path(), true);

    let sql = renderer.render("pick.sql", &SqlParams::new().with("label", "hi")).unwrap();
    assert_eq!(sql, "SELECT 'hi' AS label");
    let sql = renderer.render("pick.sql", &SqlParams::new()).unwrap();
    assert_eq!(sql, "SELECT 'none' AS label");
}

#[test]
fn trim_blocks_controls_block_newlines() {
    let dir = tempdir().expect("tempdir");
    fs::write(dir.path().join("t.sql"), "{% if true %}\nSELECT 1\n{% endif %}\n").expect("write");

    let trimmed = TemplateRenderer::new(dir.path(), true)
        .render("t.sql", &SqlParams::new())
        .unwrap();
    assert_eq!(trimmed, "SELECT 1\n");
    let kept = TemplateRenderer::new(dir.path(), false)
        .render("t.sql", &SqlParams::new())
        .unwrap();
    assert_eq!(kept, "\nSELECT 1\n");
}

#[cfg(feature = "sqlite")]
#[test]
fn sqlite_options_open_a_file_database() -> Result<(), SqlMapError> {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("map.db");
    let conn = SqliteConnection::builder(path.to_string_lossy())
        .wal(true)
        .open()?;
    conn.execute_batch("CREATE TABLE kv (k TEXT PRIMARY KEY, v TEXT);")?;

    let mut map = SqlMap::new(conn, common::template_root(), IsolationLevel::default());
    map.simple_direct_insert(
        "INSERT INTO kv (k, v) VALUES (:k, :v)",
        &SqlParams::new().with("k", "a").with("v", "1"),
    )?;
    drop(map);

    let reopened = SqliteConnection::open(&SqliteOptions::new(path.to_string_lossy()))?;
    let mut map = SqlMap::new(reopened, common::template_root(), IsolationLevel::default());
    assert_eq!(
        map.simple_direct_select_first_datum("SELECT v FROM kv WHERE k = :k", &SqlParams::new().with("k", "a"))?,
        Some(RowValues::Text("1".into()))
    );

    let empty = SqliteConnection::open(&SqliteOptions::new("")).unwrap_err();
    assert_eq!(empty.kind(), ErrorKind::Config);
    Ok(())
}
