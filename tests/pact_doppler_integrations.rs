//! Pact contract tests for the Doppler integrations API

mod common;

use common::{client_for, init_rustls, BEARER};
use doppler_manager::reconciler::{reconcile, Action, State};
use doppler_manager::resources::{IntegrationRef, IntegrationSpec, Integrations, ResourceKind};
use doppler_manager::DopplerError;
use pact_consumer::prelude::*;
use serde_json::json;

#[tokio::test]
async fn test_create_integration_with_fields_contract() {
    init_rustls();
    let mut pact_builder = PactBuilder::new("dopplerctl", "Doppler-API");

    pact_builder
        .interaction("fetch an integration that does not exist", "", |mut i| {
            i.given("no integration named prod-aws exists");
            i.request
                .method("GET")
                .path("/integrations/integraiton")
                .query_param("integration", "prod-aws")
                .header("authorization", BEARER);
            i.response
                .status(404)
                .header("content-type", "application/json")
                .json_body(json!({"messages": ["Integration not found"], "success": false}));
            i
        })
        .interaction("create an integration", "", |mut i| {
            i.given("no integration named prod-aws exists");
            i.request
                .method("POST")
                .path("/integrations")
                .header("authorization", BEARER)
                .json_body(json!({
                    "integration": "prod-aws",
                    "type": "aws_secrets_manager",
                    "region": "us-east-1"
                }));
            i.response
                .status(200)
                .header("content-type", "application/json")
                .json_body(json!({
                    "integration": {
                        "slug": "prod-aws",
                        "name": "prod-aws",
                        "type": "aws_secrets_manager",
                        "kind": "secret_sync",
                        "enabled": true
                    },
                    "success": true
                }));
            i
        });

    let mock_server = pact_builder.start_mock_server(None, None);
    let ops = Integrations::new(client_for(mock_server.url().as_str()));
    let integration = IntegrationRef::new("prod-aws");
    let desired = IntegrationSpec::from_pairs(
        Some("aws_secrets_manager".to_string()),
        &["region=us-east-1".to_string()],
    )
    .expect("valid fields");

    let result = reconcile(&ops, &integration, &desired, State::Present)
        .await
        .expect("reconcile should succeed");

    assert!(result.changed);
    assert_eq!(result.action, Action::Create);
    assert_eq!(
        result.resource.expect("created integration")["integration"]["type"],
        "aws_secrets_manager"
    );
}

#[tokio::test]
async fn test_delete_integration_is_unsupported_contract() {
    init_rustls();
    let mut pact_builder = PactBuilder::new("dopplerctl", "Doppler-API");

    pact_builder.interaction("fetch an existing integration", "", |mut i| {
        i.given("integration prod-aws exists");
        i.request
            .method("GET")
            .path("/integrations/integraiton")
            .query_param("integration", "prod-aws")
            .header("authorization", BEARER);
        i.response
            .status(200)
            .header("content-type", "application/json")
            .json_body(json!({
                "integration": {"slug": "prod-aws", "name": "prod-aws", "type": "aws_secrets_manager"},
                "success": true
            }));
        i
    });

    let mock_server = pact_builder.start_mock_server(None, None);
    let ops = Integrations::new(client_for(mock_server.url().as_str()));

    let err = reconcile(
        &ops,
        &IntegrationRef::new("prod-aws"),
        &IntegrationSpec::default(),
        State::Absent,
    )
    .await
    .expect_err("integrations cannot be deleted");

    assert!(matches!(
        err,
        DopplerError::Unsupported {
            kind: ResourceKind::Integration,
            operation: "delete"
        }
    ));
}

#[tokio::test]
async fn test_list_integrations_contract() {
    init_rustls();
    let mut pact_builder = PactBuilder::new("dopplerctl", "Doppler-API");

    pact_builder.interaction("list integrations", "", |mut i| {
        i.given("integration prod-aws exists");
        i.request
            .method("GET")
            .path("/integrations")
            .header("authorization", BEARER);
        i.response
            .status(200)
            .header("content-type", "application/json")
            .json_body(json!({
                "integrations": [{"slug": "prod-aws", "name": "prod-aws"}],
                "success": true
            }));
        i
    });

    let mock_server = pact_builder.start_mock_server(None, None);
    let ops = Integrations::new(client_for(mock_server.url().as_str()));

    let listed = ops.list().await.expect("list should succeed");

    assert_eq!(listed["integrations"][0]["slug"], "prod-aws");
}
