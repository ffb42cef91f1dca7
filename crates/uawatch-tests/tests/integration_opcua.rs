// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # OPC UA Integration Tests
//!
//! - `test_server_*`: Server lifecycle and the demo address space
//! - `test_client_*`: Client operations over local and mock transports
//! - `test_subscription_*`: Subscriptions feeding the router

use std::sync::Arc;
use std::time::Duration;

use uawatch_core::{ChannelListener, MemorySink, NodeId, NotificationRouter, Value};
use uawatch_opcua::{
    LocalTransport, ServerState, StatusCode, SubscriptionService, UaClient, UaError, UaServer,
};

use uawatch_tests::common::{
    init_test_logging, ConfigFixtures, EventFixtures, MockTransport, ServerFixtures,
};

// =============================================================================
// Server
// =============================================================================

#[tokio::test]
async fn test_server_lifecycle() {
    init_test_logging();
    let server = UaServer::new(ConfigFixtures::server_config());
    assert_eq!(server.state(), ServerState::Created);

    // Client operations need a running server.
    assert!(server.get_namespace_index("http://examples.asyncua.server").is_err());
    assert!(server.start().is_err());

    let ns = server.init().unwrap();
    assert_eq!(ns, 1);
    assert_eq!(server.state(), ServerState::Initialized);
    assert_eq!(server.router().watched_key().as_deref(), Some("temperature"));

    server.start().unwrap();
    assert!(server.state().is_running());
    assert_eq!(server.subscriptions().subscription_count(), 1);

    server.stop();
    server.stop();
    assert_eq!(server.state(), ServerState::Stopped);
    assert_eq!(server.subscriptions().subscription_count(), 0);
}

#[tokio::test]
async fn test_server_demo_address_space() {
    let server = ServerFixtures::running(Arc::new(NotificationRouter::new()));
    let nodes = server.demo_nodes().unwrap();
    let ns = nodes.namespace_index;

    let expected = [
        ("status", Value::Boolean(false)),
        ("counter", Value::Int32(0)),
        ("temperature", Value::Float(22.5)),
        ("message", Value::from("Hello OPC UA")),
    ];
    for (name, value) in expected {
        let read = server.read_value(&NodeId::string(ns, name)).unwrap();
        assert_eq!(read.value, value, "{}", name);
    }
    assert!(server
        .read_value(&NodeId::string(ns, "timestamp"))
        .unwrap()
        .value
        .as_datetime()
        .is_some());
}

#[tokio::test]
async fn test_server_unknown_monitored_variable() {
    let mut config = ConfigFixtures::server_config();
    config.monitored_variable = "pressure".to_string();
    let server = UaServer::new(config);
    let err = server.init().unwrap_err();
    assert_eq!(err.status_code(), Some(StatusCode::BadNodeIdUnknown));
}

// =============================================================================
// Client
// =============================================================================

#[tokio::test]
async fn test_client_read_write_call() {
    let (server, mut client, ns) = ServerFixtures::connected().await;

    assert_eq!(client.read_variable("counter", ns).await.unwrap(), Value::Int32(0));
    client.write_variable("counter", ns, 42i32).await.unwrap();
    client.write_variable("message", ns, "Hello from client").await.unwrap();
    assert_eq!(client.read_variable("counter", ns).await.unwrap(), Value::Int32(42));
    assert_eq!(
        client.read_variable("message", ns).await.unwrap(),
        Value::from("Hello from client")
    );

    let result = client
        .call_method("increment_value", "Device", ns, &[Value::Int32(10)])
        .await
        .unwrap();
    assert_eq!(result, vec![Value::Int32(11)]);

    client.disconnect().await.unwrap();
    assert!(!client.is_connected());
    // Disconnecting twice is fine.
    client.disconnect().await.unwrap();
    assert!(client.read_variable("counter", ns).await.is_err());

    server.stop();
}

#[tokio::test]
async fn test_client_errors() {
    let (_server, client, ns) = ServerFixtures::connected().await;

    let err = client.write_variable("counter", ns, "text").await.unwrap_err();
    assert_eq!(err.status_code(), Some(StatusCode::BadTypeMismatch));

    let err = client.read_variable("missing", ns).await.unwrap_err();
    assert_eq!(err.status_code(), Some(StatusCode::BadNodeIdUnknown));

    let err = client
        .call_method("increment_value", "Device", ns, &[Value::Int32(i32::MAX)])
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), Some(StatusCode::BadOutOfRange));
}

#[tokio::test]
async fn test_client_refused_on_other_endpoint() {
    let server = ServerFixtures::running(Arc::new(NotificationRouter::new()));
    let config = ConfigFixtures::client_config();
    let transport = LocalTransport::new("opc.tcp://localhost:4841/asyncua/server/", server);
    let mut client = UaClient::new(config, transport);
    assert!(client.connect().await.is_err());
    assert!(!client.is_connected());
}

#[tokio::test]
async fn test_client_over_mock_transport() {
    let config = ConfigFixtures::client_config();
    let transport = MockTransport::new(config.server_url.clone(), config.namespace_uri.clone())
        .with_value(NodeId::string(1, "temperature"), Value::Float(22.5));
    let mut client = UaClient::new(config, transport);

    let ns = client.connect().await.unwrap();
    assert_eq!(ns, 1);
    client.write_variable("temperature", ns, 30.5f32).await.unwrap();
    assert_eq!(
        client.read_variable("temperature", ns).await.unwrap(),
        Value::Float(30.5)
    );
    assert_eq!(
        client.transport().write_history(),
        vec![(NodeId::string(1, "temperature"), Value::Float(30.5))]
    );

    client.transport().fail_next_request();
    assert!(client.read_variable("temperature", ns).await.is_err());
    assert!(client.read_variable("temperature", ns).await.is_ok());
    assert_eq!(client.transport().request_count(), 5);
}

#[tokio::test]
async fn test_client_connect_failure_is_reported() {
    let config = ConfigFixtures::client_config();
    let transport = MockTransport::new(config.server_url.clone(), config.namespace_uri.clone());
    transport.fail_connection(true);
    let mut client = UaClient::new(config, transport);
    assert!(client.connect().await.is_err());
}

#[tokio::test(start_paused = true)]
async fn test_client_request_timeout() {
    let config = ConfigFixtures::client_config();
    let transport = MockTransport::new(config.server_url.clone(), config.namespace_uri.clone())
        .with_value(NodeId::string(1, "counter"), Value::Int32(0));
    let mut client = UaClient::new(config, transport);
    let ns = client.connect().await.unwrap();

    client.transport().set_latency(Duration::from_secs(5));
    let err = client.read_variable("counter", ns).await.unwrap_err();
    assert!(matches!(err, UaError::Connection(_)));
    assert!(err.to_string().to_lowercase().contains("timed out"));
}

// =============================================================================
// Subscriptions
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_subscription_server_router_sees_writes() {
    let sink = MemorySink::new();
    let router = Arc::new(NotificationRouter::with_sink(Arc::new(sink.clone())));
    let (ack, mut rx) = ChannelListener::with_channel("ack", 16);
    router.add_listener(Arc::new(ack));
    let server = ServerFixtures::running(router.clone());
    let ns = 1;

    assert_eq!(rx.recv().await.unwrap().1, Value::Float(22.5));

    for value in EventFixtures::temperature_sweep() {
        server
            .write_value(&NodeId::string(ns, "temperature"), Value::Float(value))
            .unwrap();
        let (key, got) = rx.recv().await.unwrap();
        assert_eq!(key, "temperature");
        assert_eq!(got, Value::Float(value));
    }

    // Writes to other variables are never delivered.
    server
        .write_value(&NodeId::string(ns, "counter"), Value::Int32(9))
        .unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(rx.try_recv().is_err());
    assert!(sink.failures().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_subscription_client_watch_and_unsubscribe() {
    let (server, client, ns) = ServerFixtures::connected().await;

    let router = Arc::new(NotificationRouter::new());
    router.set_watched_key("counter");
    let (ack, mut rx) = ChannelListener::with_channel("ack", 16);
    router.add_listener(Arc::new(ack));

    let mut handle = client
        .subscribe(Duration::from_millis(100), router.clone(), &["counter", "status"], ns)
        .await
        .unwrap();
    assert_eq!(handle.items().len(), 2);
    assert_eq!(rx.recv().await.unwrap(), ("counter".to_string(), Value::Int32(0)));

    client.write_variable("status", ns, true).await.unwrap();
    client.write_variable("counter", ns, 5i32).await.unwrap();
    assert_eq!(rx.recv().await.unwrap().1, Value::Int32(5));

    handle.unsubscribe(&client, "counter").await.unwrap();
    client.write_variable("counter", ns, 6i32).await.unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(rx.try_recv().is_err());

    handle.delete(&client).await.unwrap();
    assert_eq!(server.subscriptions().subscription_count(), 1);

    // status is delivered but filtered by the router.
    assert!(router.stats().snapshot().filtered >= 2);
}

#[tokio::test]
async fn test_subscription_zero_interval_rejected() {
    let service = SubscriptionService::new();
    let (callback, _rx) = uawatch_opcua::ChannelCallback::with_channel(4);
    assert!(service
        .create_subscription(Duration::ZERO, Arc::new(callback))
        .is_err());
}
