//! SPDX-FileCopyrightText: © 2025 Cory Parent <goedelsoup+orasi@goedelsoup.io>
//! SPDX-License-Identifier: Apache-2.0
//!

//! Consul and etcd v2 backends against mock HTTP servers

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::json;
use service_registry::{
    backends::{ConsulBackend, EtcdBackend},
    Registry, RegistryBackend, RegistryConfig, RegistryError, RegistryType, ServiceState,
};
use wiremock::matchers::{body_string, body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_consul_agent(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/v1/agent/self"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"Config": {}})))
        .mount(server)
        .await;
}

async fn consul_backend(server: &MockServer) -> ConsulBackend {
    mount_consul_agent(server).await;
    let mut backend = ConsulBackend::new(&server.uri(), "/rpcx");
    backend.initialize().await.unwrap();
    backend
}

fn consul_pair(key: &str, value: Option<&str>) -> serde_json::Value {
    json!({
        "LockIndex": 0,
        "Key": key,
        "Flags": 0,
        "Value": value.map(|v| STANDARD.encode(v)),
        "CreateIndex": 10,
        "ModifyIndex": 12
    })
}

#[tokio::test]
async fn test_consul_connect_through_facade() {
    let server = MockServer::start().await;
    mount_consul_agent(&server).await;

    let config = RegistryConfig::new(RegistryType::Consul, server.uri(), "/rpcx");
    let registry = Registry::connect(config).await.unwrap();
    assert_eq!(registry.kind(), "consul");
}

#[tokio::test]
async fn test_consul_unreachable_agent_fails_initialize() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/agent/self"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let mut backend = ConsulBackend::new(&server.uri(), "/rpcx");
    assert!(matches!(
        backend.initialize().await,
        Err(RegistryError::BackendUnavailable(_))
    ));
}

#[tokio::test]
async fn test_consul_listing() {
    let server = MockServer::start().await;
    let backend = consul_backend(&server).await;

    Mock::given(method("GET"))
        .and(path("/v1/kv/rpcx/"))
        .and(query_param("keys", ""))
        .and(query_param("separator", "/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            "rpcx/Arith/",
            "rpcx/Echo/",
            "rpcx/stray"
        ])))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1/kv/rpcx/Arith/"))
        .and(query_param("recurse", ""))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            consul_pair("rpcx/Arith/", None),
            consul_pair("rpcx/Arith/tcp@127.0.0.1:8972", Some("group=math")),
            consul_pair("rpcx/Arith/tcp@127.0.0.1:8973", Some("state=inactive")),
        ])))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1/kv/rpcx/Echo/"))
        .and(query_param("recurse", ""))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let listing = backend.scan_services().await;
    assert_eq!(listing.services.len(), 2);
    assert_eq!(listing.failed_branches, vec!["Echo".to_string()]);

    let active = listing
        .services
        .iter()
        .find(|s| s.address == "tcp@127.0.0.1:8972")
        .unwrap();
    assert_eq!(active.name, "Arith");
    assert_eq!(active.state, ServiceState::Active);
    assert_eq!(active.group.as_deref(), Some("math"));

    let inactive = listing
        .services
        .iter()
        .find(|s| s.address == "tcp@127.0.0.1:8973")
        .unwrap();
    assert_eq!(inactive.state, ServiceState::Inactive);
}

#[tokio::test]
async fn test_consul_missing_base_is_empty() {
    let server = MockServer::start().await;
    let backend = consul_backend(&server).await;

    Mock::given(method("GET"))
        .and(path("/v1/kv/rpcx/"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let listing = backend.scan_services().await;
    assert!(listing.services.is_empty());
    assert!(listing.is_complete());
}

#[tokio::test]
async fn test_consul_deactivate_rewrites_state() {
    let server = MockServer::start().await;
    let backend = consul_backend(&server).await;

    Mock::given(method("GET"))
        .and(path("/v1/kv/rpcx/Arith/tcp@127.0.0.1:8972"))
        .and(query_param("raw", ""))
        .respond_with(ResponseTemplate::new(200).set_body_string("weight=10&group=math"))
        .mount(&server)
        .await;

    Mock::given(method("PUT"))
        .and(path("/v1/kv/rpcx/Arith/tcp@127.0.0.1:8972"))
        .and(body_string("group=math&state=inactive&weight=10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(true)))
        .expect(1)
        .mount(&server)
        .await;

    backend
        .deactivate_service("Arith", "tcp@127.0.0.1:8972")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_consul_update_of_missing_key_never_writes() {
    let server = MockServer::start().await;
    let backend = consul_backend(&server).await;

    Mock::given(method("GET"))
        .and(path("/v1/kv/rpcx/Arith/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(true)))
        .expect(0)
        .mount(&server)
        .await;

    let result = backend.update_metadata("Arith", "gone", "group=web").await;
    assert!(matches!(result, Err(RegistryError::NotFound(_))));
}

async fn mount_etcd_version(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/version"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"etcdserver": "2.3.8", "etcdcluster": "2.3.0"})),
        )
        .mount(server)
        .await;
}

async fn etcd_backend(server: &MockServer) -> EtcdBackend {
    mount_etcd_version(server).await;
    let mut backend = EtcdBackend::new(&server.uri(), "/rpcx/");
    backend.initialize().await.unwrap();
    backend
}

#[tokio::test]
async fn test_etcd_listing() {
    let server = MockServer::start().await;
    let backend = etcd_backend(&server).await;

    Mock::given(method("GET"))
        .and(path("/v2/keys/rpcx"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "action": "get",
            "node": {
                "key": "/rpcx",
                "dir": true,
                "nodes": [
                    {"key": "/rpcx/Arith", "dir": true, "modifiedIndex": 4, "createdIndex": 4},
                    {"key": "/rpcx/Vanished", "dir": true, "modifiedIndex": 5, "createdIndex": 5},
                    {"key": "/rpcx/stray", "value": "x", "modifiedIndex": 6, "createdIndex": 6}
                ]
            }
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v2/keys/rpcx/Arith"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "action": "get",
            "node": {
                "key": "/rpcx/Arith",
                "dir": true,
                "nodes": [
                    {"key": "/rpcx/Arith/tcp@10.0.0.1:8972", "value": "state=inactive&group=math"},
                    {"key": "/rpcx/Arith/tcp@10.0.0.2:8972"}
                ]
            }
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v2/keys/rpcx/Vanished"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "errorCode": 100,
            "message": "Key not found",
            "cause": "/rpcx/Vanished"
        })))
        .mount(&server)
        .await;

    let listing = backend.scan_services().await;
    assert!(listing.is_complete());
    assert_eq!(listing.services.len(), 2);

    let inactive = listing
        .services
        .iter()
        .find(|s| s.address == "tcp@10.0.0.1:8972")
        .unwrap();
    assert_eq!(inactive.name, "Arith");
    assert_eq!(inactive.state, ServiceState::Inactive);
    assert_eq!(inactive.group.as_deref(), Some("math"));

    let valueless = listing
        .services
        .iter()
        .find(|s| s.address == "tcp@10.0.0.2:8972")
        .unwrap();
    assert_eq!(valueless.state, ServiceState::Unknown);
}

#[tokio::test]
async fn test_etcd_activate_requires_existing_key() {
    let server = MockServer::start().await;
    let backend = etcd_backend(&server).await;

    Mock::given(method("GET"))
        .and(path("/v2/keys/rpcx/Arith/tcp@10.0.0.1:8972"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "action": "get",
            "node": {"key": "/rpcx/Arith/tcp@10.0.0.1:8972", "value": "state=inactive"}
        })))
        .mount(&server)
        .await;

    Mock::given(method("PUT"))
        .and(path("/v2/keys/rpcx/Arith/tcp@10.0.0.1:8972"))
        .and(body_string_contains("value=state%3Dactive"))
        .and(body_string_contains("prevExist=true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "action": "update",
            "node": {"key": "/rpcx/Arith/tcp@10.0.0.1:8972", "value": "state=active"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    backend
        .activate_service("Arith", "tcp@10.0.0.1:8972")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_etcd_read_of_missing_key_is_not_found() {
    let server = MockServer::start().await;
    let backend = etcd_backend(&server).await;

    Mock::given(method("GET"))
        .and(path("/v2/keys/rpcx/Arith/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    assert!(matches!(
        backend.deactivate_service("Arith", "gone").await,
        Err(RegistryError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_etcd_unreachable_base_is_reported() {
    let server = MockServer::start().await;
    let backend = etcd_backend(&server).await;

    Mock::given(method("GET"))
        .and(path("/v2/keys/rpcx"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let listing = backend.scan_services().await;
    assert!(listing.services.is_empty());
    assert_eq!(listing.failed_branches, vec!["rpcx".to_string()]);
}

#[tokio::test]
async fn test_consul_reserved_characters_stay_in_the_key() {
    let server = MockServer::start().await;
    let backend = consul_backend(&server).await;

    Mock::given(method("GET"))
        .and(path("/v1/kv/rpcx/Arith/a%3Fb%25c"))
        .and(query_param("raw", ""))
        .respond_with(ResponseTemplate::new(200).set_body_string("group=web"))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("PUT"))
        .and(path("/v1/kv/rpcx/Arith/a%3Fb%25c"))
        .and(body_string("group=web&state=inactive"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(true)))
        .expect(1)
        .mount(&server)
        .await;

    // the sibling leaf a naive URL would resolve to
    Mock::given(path("/v1/kv/rpcx/Arith/a"))
        .respond_with(ResponseTemplate::new(200).set_body_string("group=other"))
        .expect(0)
        .mount(&server)
        .await;

    backend.deactivate_service("Arith", "a?b%c").await.unwrap();
}

#[tokio::test]
async fn test_etcd_reserved_characters_stay_in_the_key() {
    let server = MockServer::start().await;
    let backend = etcd_backend(&server).await;

    Mock::given(method("GET"))
        .and(path("/v2/keys/rpcx/Arith/a%3Fb%25c"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "action": "get",
            "node": {"key": "/rpcx/Arith/a?b%c", "value": "state=inactive"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("PUT"))
        .and(path("/v2/keys/rpcx/Arith/a%3Fb%25c"))
        .and(body_string_contains("value=state%3Dactive"))
        .and(body_string_contains("prevExist=true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "action": "update",
            "node": {"key": "/rpcx/Arith/a?b%c", "value": "state=active"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(path("/v2/keys/rpcx/Arith/a"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    backend.activate_service("Arith", "a?b%c").await.unwrap();
}

#[tokio::test]
async fn test_health_check_requires_initialize() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let consul = ConsulBackend::new(&server.uri(), "/rpcx");
    assert!(matches!(
        consul.health_check().await,
        Err(RegistryError::BackendUnavailable(_))
    ));

    let etcd = EtcdBackend::new(&server.uri(), "/rpcx");
    assert!(matches!(
        etcd.health_check().await,
        Err(RegistryError::BackendUnavailable(_))
    ));
}
