use showdb::catalog::Catalog;
use showdb::executor::{Datum, ExecutionEngine};
use showdb::Error;
use std::sync::Arc;

fn engine() -> ExecutionEngine {
    let mut engine = ExecutionEngine::new(Arc::new(Catalog::new()));
    engine
        .execute("CREATE DATABASE db; SET DATABASE = db; CREATE TABLE t (a INT)")
        .unwrap();
    engine
}

#[test]
fn test_transaction_lifecycle() {
    let mut engine = engine();

    // BEGIN
    let result = engine.execute("BEGIN").unwrap();
    assert_eq!(result.message.as_deref(), Some("BEGIN"));
    assert!(engine.current_transaction().is_some());

    // COMMIT
    let result = engine.execute("COMMIT").unwrap();
    assert_eq!(result.message.as_deref(), Some("COMMIT"));
    assert!(engine.current_transaction().is_none());

    // BEGIN & ROLLBACK
    engine.execute("BEGIN TRANSACTION").unwrap();
    let result = engine.execute("ROLLBACK").unwrap();
    assert_eq!(result.message.as_deref(), Some("ROLLBACK"));
    assert!(matches!(engine.execute("ROLLBACK"), Err(Error::NoTransaction)));
    assert_eq!(engine.transaction_manager().active_count(), 0);
}

#[test]
fn test_statements_share_the_explicit_transaction() {
    let mut engine = engine();
    let result = engine
        .execute("BEGIN; SHOW TABLES; SHOW COLUMNS FROM t")
        .unwrap();
    assert_eq!(result.rows[0][0], Datum::string("a"));
    assert_eq!(engine.transaction_manager().active_count(), 1);
    engine.execute("COMMIT").unwrap();
    assert_eq!(engine.transaction_manager().active_count(), 0);
}

#[test]
fn test_finished_transaction_cannot_be_read() {
    let mut engine = engine();
    engine.execute("BEGIN").unwrap();
    let txn = engine.current_transaction().unwrap().clone();
    engine.execute("COMMIT").unwrap();

    assert!(matches!(txn.read(), Err(Error::TransactionAborted(id)) if id == txn.id()));
}
