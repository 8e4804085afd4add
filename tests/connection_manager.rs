use std::sync::Arc;
use std::time::Duration;

use sqlhelpers::drivers::{
    InMemoryTestConnector, InMemoryTestDriver, InMemoryTestResponseBuilder, QueryKind,
};
use sqlhelpers::error::SqlHelpersError;
use sqlhelpers::traits::Connector;
use sqlhelpers::types::{Capabilities, DriverKind, SqlValue};
use sqlhelpers::{params, ConnectionManager, DbConfig};

fn mysql_config() -> DbConfig {
    DbConfig::new("mysql")
        .with_database("shop")
        .with_username("app")
        .with_password("secret")
}

fn manager_with(
    config: DbConfig,
    connector: InMemoryTestConnector,
) -> (ConnectionManager, Arc<InMemoryTestConnector>) {
    let connector = Arc::new(connector);
    let manager = ConnectionManager::with_connector(
        config,
        Arc::clone(&connector) as Arc<dyn Connector>,
    );
    (manager, connector)
}

#[tokio::test]
async fn test_connection_is_opened_once() {
    let (manager, connector) = manager_with(
        mysql_config(),
        InMemoryTestConnector::new(Arc::new(InMemoryTestDriver::new())),
    );
    assert!(!manager.is_connected().await);

    manager.statement("DELETE FROM carts", &[]).await.unwrap();
    manager
        .select_one("SELECT * FROM users WHERE id = ?", 1)
        .await
        .unwrap();
    manager
        .select_all("SELECT * FROM users WHERE role = ?", &params!["admin"])
        .await
        .unwrap();
    manager.query("SELECT * FROM users").await.unwrap();
    manager.connection().await.unwrap();

    assert_eq!(connector.connect_attempts(), 1);
    assert!(manager.is_connected().await);
    connector.driver().assert_query_count(4);
}

#[tokio::test]
async fn test_connection_returns_the_same_handle() {
    let (manager, _connector) = manager_with(
        mysql_config(),
        InMemoryTestConnector::new(Arc::new(InMemoryTestDriver::new())),
    );

    let first = manager.connection().await.unwrap();
    let second = manager.connection().await.unwrap();
    assert!(Arc::ptr_eq(&first, &second));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_first_use_opens_one_connection() {
    let (manager, connector) = manager_with(
        mysql_config(),
        InMemoryTestConnector::new(Arc::new(InMemoryTestDriver::new()))
            .with_connect_delay(Duration::from_millis(50)),
    );
    let manager = Arc::new(manager);

    let tasks: Vec<_> = (0..16)
        .map(|i| {
            let manager = Arc::clone(&manager);
            tokio::spawn(async move {
                manager
                    .select_all("SELECT * FROM users WHERE id = ?", &params![i])
                    .await
            })
        })
        .collect();

    for task in tasks {
        task.await.unwrap().unwrap();
    }

    assert_eq!(connector.connect_attempts(), 1);
    connector.driver().assert_query_count(16);
}

#[tokio::test]
async fn test_failed_connection_is_retried() {
    let (manager, connector) = manager_with(
        mysql_config(),
        InMemoryTestConnector::new(Arc::new(InMemoryTestDriver::new()))
            .with_connect_error("Access denied for user 'app'"),
    );

    let err = manager.query("SELECT 1").await.unwrap_err();
    match &err {
        SqlHelpersError::Connection(cause) => {
            assert_eq!(cause.message(), "Access denied for user 'app'")
        }
        other => panic!("Expected Connection error, got {:?}", other),
    }
    assert_eq!(
        err.to_string(),
        "Connection failed: Access denied for user 'app'"
    );
    assert!(!manager.is_connected().await);

    manager.query("SELECT 1").await.unwrap();
    assert_eq!(connector.connect_attempts(), 2);
    assert!(manager.is_connected().await);

    manager.query("SELECT 1").await.unwrap();
    assert_eq!(connector.connect_attempts(), 2);
}

#[tokio::test]
async fn test_unsupported_driver_never_connects() {
    let (manager, connector) = manager_with(
        mysql_config().with_driver("postgres"),
        InMemoryTestConnector::new(Arc::new(InMemoryTestDriver::new())),
    );

    match manager.connection().await {
        Err(SqlHelpersError::UnsupportedDriver(name)) => assert_eq!(name, "postgres"),
        Err(other) => panic!("Expected UnsupportedDriver, got {:?}", other),
        Ok(_) => panic!("Expected UnsupportedDriver, got a connection"),
    }

    let err = manager
        .statement("UPDATE t SET x = ?", &params![1])
        .await
        .unwrap_err();
    assert!(matches!(err, SqlHelpersError::UnsupportedDriver(_)));

    assert_eq!(connector.connect_attempts(), 0);
    connector.driver().assert_query_count(0);
}

#[tokio::test]
async fn test_connect_options_for_mysql() {
    let (manager, connector) = manager_with(
        mysql_config(),
        InMemoryTestConnector::new(Arc::new(InMemoryTestDriver::new())).with_capabilities(
            Capabilities {
                numeric_fetch: true,
            },
        ),
    );
    manager.connection().await.unwrap();

    let options = connector.last_options().unwrap();
    assert_eq!(options.driver, DriverKind::MySql);
    assert_eq!(options.dsn, "mysql:host=127.0.0.1;dbname=shop;charset=utf8mb4");
    assert_eq!(options.username, "app");
    assert_eq!(options.password, "secret");
    assert!(!options.fetch_numeric_types);
}

#[tokio::test]
async fn test_connect_options_for_sqlsrv_named_instance() {
    let config = DbConfig::new("SQLSRV")
        .with_database("erp")
        .with_server("localhost\\INSTANCE")
        .with_trust_certificate(true);
    let (manager, connector) = manager_with(
        config,
        InMemoryTestConnector::new(Arc::new(InMemoryTestDriver::new())).with_capabilities(
            Capabilities {
                numeric_fetch: true,
            },
        ),
    );
    manager.connection().await.unwrap();

    let options = connector.last_options().unwrap();
    assert_eq!(options.driver, DriverKind::SqlSrv);
    assert_eq!(options.dsn, "sqlsrv:Server=localhost\\\\INSTANCE;Database=erp");
    assert_eq!(options.server, "localhost\\INSTANCE");
    assert!(options.fetch_numeric_types);
    assert!(options.trust_certificate);
}

#[tokio::test]
async fn test_sqlsrv_without_numeric_capability_still_connects() {
    let (manager, connector) = manager_with(
        DbConfig::new("sqlsrv").with_database("erp"),
        InMemoryTestConnector::new(Arc::new(InMemoryTestDriver::new())),
    );
    manager.connection().await.unwrap();

    let options = connector.last_options().unwrap();
    assert_eq!(options.dsn, "sqlsrv:Server=localhost;Database=erp");
    assert!(!options.fetch_numeric_types);
}

#[tokio::test]
async fn test_statement_binds_values_in_order() {
    let driver = Arc::new(InMemoryTestDriver::new().with_affected_rows(1));
    let (manager, _connector) = manager_with(
        mysql_config(),
        InMemoryTestConnector::new(Arc::clone(&driver)),
    );

    let ok = manager
        .statement("UPDATE t SET x=? WHERE id=?", &params![5, 3])
        .await
        .unwrap();

    assert!(ok);
    driver.assert_last_query(
        "UPDATE t SET x=? WHERE id=?",
        &[SqlValue::Int32(5), SqlValue::Int32(3)],
    );
    assert_eq!(driver.last_query().unwrap().kind, QueryKind::Execute);
}

#[tokio::test]
async fn test_statement_wraps_driver_error() {
    let driver = Arc::new(
        InMemoryTestDriver::new().with_error("Duplicate entry '3' for key 'PRIMARY'"),
    );
    let (manager, _connector) = manager_with(
        mysql_config(),
        InMemoryTestConnector::new(Arc::clone(&driver)),
    );

    let err = manager
        .statement("INSERT INTO t (id) VALUES (?)", &params![3])
        .await
        .unwrap_err();

    assert!(matches!(err, SqlHelpersError::Statement(_)));
    assert_eq!(
        err.to_string(),
        "Error on statement: Duplicate entry '3' for key 'PRIMARY'"
    );
}

#[tokio::test]
async fn test_statement_with_missing_values_fails() {
    let driver = Arc::new(InMemoryTestDriver::new());
    let (manager, _connector) = manager_with(
        mysql_config(),
        InMemoryTestConnector::new(Arc::clone(&driver)),
    );

    let err = manager
        .statement("UPDATE t SET x=? WHERE id=?", &params![5])
        .await
        .unwrap_err();
    assert!(matches!(err, SqlHelpersError::Statement(_)));
}

#[tokio::test]
async fn test_select_one_returns_first_row() {
    let driver = Arc::new(
        InMemoryTestDriver::new().with_response(
            InMemoryTestResponseBuilder::new()
                .columns(&["id", "name"])
                .values(vec![SqlValue::Int64(3), SqlValue::from("Carol")])
                .values(vec![SqlValue::Int64(4), SqlValue::from("Dave")])
                .build(),
        ),
    );
    let (manager, _connector) = manager_with(
        mysql_config(),
        InMemoryTestConnector::new(Arc::clone(&driver)),
    );

    let row = manager
        .select_one("SELECT * FROM t WHERE id=?", 3)
        .await
        .unwrap()
        .expect("a row");

    assert_eq!(row.get("id").unwrap(), &SqlValue::Int64(3));
    assert_eq!(row.get("name").unwrap().as_str(), Some("Carol"));
    assert_eq!(row.columns(), &["id".to_string(), "name".to_string()]);

    driver.assert_last_query("SELECT * FROM t WHERE id=?", &[SqlValue::Int32(3)]);
    assert_eq!(driver.last_query().unwrap().kind, QueryKind::FetchOne);
}

#[tokio::test]
async fn test_select_one_without_match_is_none() {
    let driver = Arc::new(
        InMemoryTestDriver::new().with_response(
            InMemoryTestResponseBuilder::new()
                .columns(&["id", "name"])
                .build(),
        ),
    );
    let (manager, _connector) = manager_with(
        mysql_config(),
        InMemoryTestConnector::new(Arc::clone(&driver)),
    );

    let row = manager
        .select_one("SELECT * FROM t WHERE id=?", 3)
        .await
        .unwrap();
    assert!(row.is_none());
}

#[tokio::test]
async fn test_select_one_wraps_driver_error() {
    let driver = Arc::new(InMemoryTestDriver::new().with_error("Unknown column 'idd'"));
    let (manager, _connector) = manager_with(
        mysql_config(),
        InMemoryTestConnector::new(Arc::clone(&driver)),
    );

    let err = manager
        .select_one("SELECT * FROM t WHERE idd=?", "x")
        .await
        .unwrap_err();

    match &err {
        SqlHelpersError::Query { operation, source } => {
            assert_eq!(*operation, "select one");
            assert_eq!(source.message(), "Unknown column 'idd'");
        }
        other => panic!("Expected Query error, got {:?}", other),
    }
    assert_eq!(err.to_string(), "Error on select one: Unknown column 'idd'");
}

#[tokio::test]
async fn test_select_all_returns_rows_in_order() {
    let driver = Arc::new(
        InMemoryTestDriver::new().with_response(
            InMemoryTestResponseBuilder::new()
                .columns(&["id", "x"])
                .row(&["1", "5"])
                .row(&["2", "5"])
                .row(&["3", "5"])
                .build(),
        ),
    );
    let (manager, _connector) = manager_with(
        mysql_config(),
        InMemoryTestConnector::new(Arc::clone(&driver)),
    );

    let result = manager
        .select_all("SELECT * FROM t WHERE x=?", &params![5])
        .await
        .unwrap();

    assert_eq!(result.len(), 3);
    let ids: Vec<i64> = result
        .rows()
        .iter()
        .filter_map(|row| row.get("id").ok().and_then(SqlValue::as_i64))
        .collect();
    assert_eq!(ids, vec![1, 2, 3]);

    driver.assert_last_query("SELECT * FROM t WHERE x=?", &[SqlValue::Int32(5)]);
    assert_eq!(driver.last_query().unwrap().kind, QueryKind::FetchAll);
}

#[tokio::test]
async fn test_select_all_may_be_empty() {
    let driver = Arc::new(InMemoryTestDriver::new());
    let (manager, _connector) = manager_with(
        mysql_config(),
        InMemoryTestConnector::new(Arc::clone(&driver)),
    );

    let result = manager
        .select_all("SELECT * FROM t WHERE x=?", &params![5])
        .await
        .unwrap();
    assert!(result.is_empty());
}

#[tokio::test]
async fn test_select_all_wraps_driver_error() {
    let driver = Arc::new(InMemoryTestDriver::new().with_error("Table 'shop.t' doesn't exist"));
    let (manager, _connector) = manager_with(
        mysql_config(),
        InMemoryTestConnector::new(Arc::clone(&driver)),
    );

    let err = manager
        .select_all("SELECT * FROM t WHERE x=?", &params![5])
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Error on select all: Table 'shop.t' doesn't exist"
    );
}

#[tokio::test]
async fn test_query_binds_nothing() {
    let driver = Arc::new(
        InMemoryTestDriver::new().with_response(
            InMemoryTestResponseBuilder::new()
                .columns(&["id"])
                .row(&["1"])
                .row(&["2"])
                .build(),
        ),
    );
    let (manager, _connector) = manager_with(
        mysql_config(),
        InMemoryTestConnector::new(Arc::clone(&driver)),
    );

    let result = manager.query("SELECT * FROM t").await.unwrap();

    assert_eq!(result.len(), 2);
    driver.assert_last_query("SELECT * FROM t", &[]);
}

#[tokio::test]
async fn test_query_with_placeholder_fails() {
    let driver = Arc::new(InMemoryTestDriver::new());
    let (manager, _connector) = manager_with(
        mysql_config(),
        InMemoryTestConnector::new(Arc::clone(&driver)),
    );

    let err = manager
        .query("SELECT * FROM t WHERE id = ?")
        .await
        .unwrap_err();

    match err {
        SqlHelpersError::Query { operation, .. } => assert_eq!(operation, "select"),
        other => panic!("Expected Query error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_close_resets_the_manager() {
    let driver = Arc::new(InMemoryTestDriver::new());
    let (manager, connector) = manager_with(
        mysql_config(),
        InMemoryTestConnector::new(Arc::clone(&driver)),
    );

    // Closing before anything was opened is a no-op
    manager.close().await.unwrap();
    assert!(!driver.is_closed());

    manager.query("SELECT 1").await.unwrap();
    manager.close().await.unwrap();

    assert!(driver.is_closed());
    assert!(!manager.is_connected().await);
    assert_eq!(connector.connect_attempts(), 1);

    // The next call opens again
    manager.query("SELECT 1").await.unwrap();
    assert_eq!(connector.connect_attempts(), 2);
    assert!(!driver.is_closed());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_query_during_close_waits_for_the_old_session() {
    let driver = Arc::new(InMemoryTestDriver::new().with_close_delay(Duration::from_millis(100)));
    let (manager, connector) = manager_with(
        mysql_config(),
        InMemoryTestConnector::new(Arc::clone(&driver)),
    );
    let manager = Arc::new(manager);

    manager.query("SELECT 1").await.unwrap();
    assert_eq!(connector.live_connections(), 1);

    let closing = {
        let manager = Arc::clone(&manager);
        tokio::spawn(async move { manager.close().await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;

    manager.query("SELECT 1").await.unwrap();
    closing.await.unwrap().unwrap();

    assert_eq!(driver.close_count(), 1);
    assert_eq!(connector.connect_attempts(), 2);
    assert_eq!(connector.live_connections(), 1);
    assert_eq!(connector.peak_live_connections(), 1);
}
