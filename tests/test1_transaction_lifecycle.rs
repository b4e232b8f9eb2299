mod common;

use common::ScriptedConnection;
use sql_map::prelude::*;

#[test]
fn begin_without_connection_is_null_connection() {
    let mut tx: TransactionManager<ScriptedConnection> =
        TransactionManager::detached(IsolationLevel::ReadCommitted);
    let err = tx.begin(None).unwrap_err();
    assert!(matches!(err, SqlMapError::NullConnection));
    assert!(!tx.is_active());
}

#[test]
fn begin_on_closed_connection_is_connection_closed() {
    let conn = ScriptedConnection {
        closed: true,
        ..ScriptedConnection::new()
    };
    let log = conn.log.clone();
    let mut tx = TransactionManager::new(conn, IsolationLevel::ReadCommitted);
    let err = tx.begin(None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ConnectionClosed);
    assert!(log.lock().unwrap().is_empty());
}

#[test]
fn second_begin_leaves_open_cursor_alone() {
    let conn = ScriptedConnection::new();
    let log = conn.log.clone();
    let mut tx = TransactionManager::new(conn, IsolationLevel::Serializable);
    tx.begin(None).unwrap();
    let err = tx.begin(Some(IsolationLevel::ReadUncommitted)).unwrap_err();
    assert!(matches!(err, SqlMapError::CursorAlreadyOpen));

    assert!(tx.is_active());
    assert_eq!(tx.isolation_level(), Some(IsolationLevel::Serializable));
    tx.cursor_mut().unwrap().execute("SELECT 1", &SqlParams::new()).unwrap();
    tx.end().unwrap();

    assert_eq!(
        *log.lock().unwrap(),
        vec!["cursor", "isolation SERIALIZABLE", "execute SELECT 1", "close"]
    );
}

#[test]
fn begin_applies_the_default_isolation_level() {
    let conn = ScriptedConnection::new();
    let log = conn.log.clone();
    let mut tx = TransactionManager::new(conn, IsolationLevel::ReadCommitted);

    tx.begin(Some(IsolationLevel::RepeatableRead)).unwrap();
    // the requested level is recorded, the connection gets the default
    assert_eq!(tx.isolation_level(), Some(IsolationLevel::RepeatableRead));
    assert_eq!(
        tx.connection().unwrap().isolation_level(),
        IsolationLevel::ReadCommitted
    );
    tx.end().unwrap();
    assert_eq!(tx.isolation_level(), None);

    tx.set_default_isolation_level(IsolationLevel::Serializable);
    tx.begin(None).unwrap();
    assert_eq!(tx.isolation_level(), Some(IsolationLevel::Serializable));
    tx.end().unwrap();

    let calls = log.lock().unwrap();
    assert!(!calls.contains(&"isolation REPEATABLE READ".to_owned()));
    assert_eq!(
        calls.iter().filter(|c| c.starts_with("isolation")).collect::<Vec<_>>(),
        ["isolation READ COMMITTED", "isolation SERIALIZABLE"]
    );
}

#[test]
fn failed_isolation_releases_the_cursor() {
    let conn = ScriptedConnection {
        fail_isolation: true,
        ..ScriptedConnection::new()
    };
    let log = conn.log.clone();
    let mut tx = TransactionManager::new(conn, IsolationLevel::ReadCommitted);
    assert!(tx.begin(None).unwrap_err().is_execution_error());
    assert!(!tx.is_active());
    assert_eq!(log.lock().unwrap().last().map(String::as_str), Some("close"));
}

#[test]
fn end_without_begin_is_consistency_error() {
    let mut tx = TransactionManager::new(ScriptedConnection::new(), IsolationLevel::default());
    let err = tx.end().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Consistency);
}

#[test]
fn end_is_idle_even_when_close_fails() {
    let conn = ScriptedConnection {
        fail_close: true,
        ..ScriptedConnection::new()
    };
    let mut tx = TransactionManager::new(conn, IsolationLevel::default());
    tx.begin(None).unwrap();
    assert!(tx.end().is_err());
    assert!(!tx.is_active());
    tx.begin(None).unwrap();
}

#[test]
fn commit_and_rollback_pass_through_outside_unit_of_work() {
    let conn = ScriptedConnection::new();
    let log = conn.log.clone();
    let mut tx = TransactionManager::new(conn, IsolationLevel::default());
    tx.commit().unwrap();
    tx.rollback().unwrap();
    assert_eq!(*log.lock().unwrap(), vec!["commit", "rollback"]);
}

#[test]
fn attach_and_detach_only_while_idle() {
    let mut tx = TransactionManager::new(ScriptedConnection::new(), IsolationLevel::default());
    tx.begin(None).unwrap();
    assert_eq!(tx.detach().unwrap_err().kind(), ErrorKind::Consistency);
    assert_eq!(
        tx.attach(ScriptedConnection::new()).unwrap_err().kind(),
        ErrorKind::Consistency
    );
    tx.end().unwrap();

    let previous = tx.detach().unwrap();
    assert!(previous.is_some());
    assert!(matches!(tx.begin(None), Err(SqlMapError::NullConnection)));
    assert!(tx.attach(ScriptedConnection::new()).unwrap().is_none());
    tx.begin(None).unwrap();
}

#[test]
fn executor_calls_need_an_open_cursor() {
    let mut map = SqlMap::new(
        ScriptedConnection::new(),
        common::template_root(),
        IsolationLevel::default(),
    );
    let err = map
        .direct_select("SELECT 1", &SqlParams::new())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Consistency);
    let err = map.insert("insert_user.sql", &SqlParams::new()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Consistency);
}

#[cfg(feature = "sqlite")]
#[test]
fn closed_sqlite_connection_refuses_begin() -> Result<(), SqlMapError> {
    let mut map = common::users_map()?;
    if let Some(conn) = map.connection_mut() {
        conn.close()?;
    }
    assert!(matches!(map.begin(None), Err(SqlMapError::ConnectionClosed)));
    assert!(matches!(
        map.simple_direct_select("SELECT 1", &SqlParams::new()),
        Err(SqlMapError::ConnectionClosed)
    ));
    Ok(())
}
