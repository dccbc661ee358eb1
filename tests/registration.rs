//! Registration rules and the warnings they log.

mod common;

use common::{LoggerHandle, TestServer, local_config, logger};
use rstest::rstest;
use serde_json::{Value, json};
use serial_test::serial;
use wirecall::{
    client::RpcClient,
    registry::{HandlerResult, Registration},
    server::{RpcServer, ServerConfig, ServerError},
};

fn first(_: &[Value]) -> HandlerResult { Ok(json!("first")) }

fn second(_: &[Value]) -> HandlerResult { Ok(json!("second")) }

#[rstest]
#[serial]
#[tokio::test]
async fn duplicate_registration_warns_and_keeps_first(
    mut logger: LoggerHandle,
    local_config: ServerConfig,
) {
    let server = RpcServer::with_config(local_config);
    assert_eq!(server.register("which", first).expect("register"), Registration::Added);
    assert_eq!(
        server.register("which", second).expect("register"),
        Registration::AlreadyRegistered
    );
    assert!(logger.contains(log::Level::Warn, "function already registered"));

    let server = TestServer::start(server).await;
    let mut client = RpcClient::connect(server.addr).await.expect("connect");
    let result = client.call("which", vec![]).await.expect("call succeeds");
    assert_eq!(result, json!("first"));
    server.shutdown().await;
}

#[rstest]
#[serial]
#[tokio::test]
async fn registration_is_rejected_once_listening(local_config: ServerConfig) {
    let server = TestServer::start(RpcServer::with_config(local_config)).await;

    let err = server
        .server
        .register("late", first)
        .expect_err("server already listening");
    assert!(matches!(err, ServerError::AlreadyRunning));

    let mut client = RpcClient::connect(server.addr).await.expect("connect");
    assert!(client.call("late", vec![]).await.is_err());
    server.shutdown().await;
}

#[rstest]
#[serial]
#[tokio::test]
async fn handler_panics_are_logged_and_contained(
    mut logger: LoggerHandle,
    local_config: ServerConfig,
) {
    let server = RpcServer::with_config(local_config);
    server
        .register("explode", |_: &[Value]| -> HandlerResult { panic!("kaboom") })
        .expect("register");
    server.register("first", first).expect("register");
    let server = TestServer::start(server).await;
    let mut client = RpcClient::connect(server.addr).await.expect("connect");

    let err = client.call("explode", vec![]).await.expect_err("handler panicked");
    assert_eq!(err.to_string(), "Execution error: kaboom");
    let result = client.call("first", vec![]).await.expect("server still healthy");
    assert_eq!(result, json!("first"));

    server.shutdown().await;
    assert!(logger.contains(log::Level::Error, "handler panicked"));
}
