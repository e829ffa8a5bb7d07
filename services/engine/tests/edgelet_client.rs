//! Identity client tests against a mock management API

use std::sync::Arc;

use edge_identity_engine::module_identity::{
    EdgeletIdentityClient, IdentityError, IdentityStore, Module,
    ModuleConnectionStringBuilder, ModuleIdentityReconciler, ModuleSet, ReconcilerConfig,
    DEFAULT_API_VERSION,
};
use serde_json::json;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> EdgeletIdentityClient {
    EdgeletIdentityClient::new(&server.uri(), DEFAULT_API_VERSION).unwrap()
}

#[tokio::test]
async fn test_list_identities() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/identities/"))
        .and(query_param("api-version", DEFAULT_API_VERSION))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "identities": [
                {"moduleId": "$edgeHub", "managedBy": "IotEdge", "generationId": "1"},
                {"moduleId": "tempSensor", "managedBy": "other"}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let identities = client(&server).list_identities().await.unwrap();

    assert_eq!(identities.len(), 2);
    assert_eq!(identities[0].module_id, "$edgeHub");
    assert_eq!(identities[0].generation_id.as_deref(), Some("1"));
    assert_eq!(identities[1].managed_by, "other");
}

#[tokio::test]
async fn test_create_identity() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/identities/"))
        .and(body_json(json!({"moduleId": "tempSensor", "managedBy": "IotEdge"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "moduleId": "tempSensor",
            "managedBy": "IotEdge",
            "generationId": "42"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let identity = client(&server)
        .create_identity("tempSensor", "IotEdge")
        .await
        .unwrap();

    assert_eq!(identity.module_id, "tempSensor");
    assert_eq!(identity.generation_id.as_deref(), Some("42"));
}

#[tokio::test]
async fn test_remove_identity_encodes_name() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/identities/%24edgeAgent"))
        .and(query_param("api-version", DEFAULT_API_VERSION))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    client(&server).remove_identity("$edgeAgent").await.unwrap();
}

#[tokio::test]
async fn test_error_message_is_surfaced() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/identities/"))
        .respond_with(
            ResponseTemplate::new(409).set_body_json(json!({"message": "Identity quota exceeded"})),
        )
        .mount(&server)
        .await;

    let err = client(&server)
        .create_identity("tempSensor", "IotEdge")
        .await
        .unwrap_err();

    let message = err.to_string();
    assert!(message.contains("409"), "{message}");
    assert!(message.contains("Identity quota exceeded"), "{message}");
}

fn reconciler(server: &MockServer) -> ModuleIdentityReconciler {
    let builder = ModuleConnectionStringBuilder::new("hub.azure-devices.net", "edge-device").unwrap();
    ModuleIdentityReconciler::new(
        Arc::new(client(server)),
        builder,
        &ReconcilerConfig::new("edge-gateway.local"),
    )
    .unwrap()
}

fn modules(names: &[&str]) -> ModuleSet {
    ModuleSet::new(names.iter().map(|n| Module::new(*n, format!("{}:1.0", n)))).unwrap()
}

#[tokio::test]
async fn test_reconcile_swaps_identities() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/identities/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "identities": [
                {"moduleId": "$edgeHub", "managedBy": "IotEdge"},
                {"moduleId": "old", "managedBy": "IotEdge"}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/identities/old"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/identities/"))
        .and(body_json(json!({"moduleId": "new", "managedBy": "IotEdge"})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"moduleId": "new", "managedBy": "IotEdge"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let identities = reconciler(&server)
        .reconcile(&modules(&["edgeHub", "new"]), &modules(&["edgeHub", "old"]))
        .await
        .unwrap();

    let names: Vec<&str> = identities.names().collect();
    assert_eq!(names, vec!["edgeHub", "new"]);
    assert_eq!(
        identities.get("new").unwrap().credential.to_string(),
        "HostName=hub.azure-devices.net;DeviceId=edge-device;ModuleId=new;GatewayHostName=edge-gateway.local"
    );
    assert_eq!(
        identities.get("edgeHub").unwrap().credential.to_string(),
        "HostName=hub.azure-devices.net;DeviceId=edge-device;ModuleId=$edgeHub"
    );
}

#[tokio::test]
async fn test_reconcile_surfaces_directory_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/identities/"))
        .respond_with(ResponseTemplate::new(500).set_body_string("daemon unavailable"))
        .mount(&server)
        .await;

    let err = reconciler(&server)
        .reconcile(&modules(&["a"]), &ModuleSet::empty())
        .await
        .unwrap_err();

    assert!(matches!(err, IdentityError::Directory { .. }));
}
