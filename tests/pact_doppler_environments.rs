//! Pact contract tests for the Doppler environments API

mod common;

use common::{client_for, init_rustls, BEARER};
use doppler_manager::reconciler::{preview, reconcile, Action, State};
use doppler_manager::resources::{EnvironmentRef, Environments};
use pact_consumer::prelude::*;
use serde_json::json;

#[tokio::test]
async fn test_create_environment_with_derived_slug_contract() {
    init_rustls();
    let mut pact_builder = PactBuilder::new("dopplerctl", "Doppler-API");

    pact_builder
        .interaction("fetch an environment that does not exist", "", |mut i| {
            i.given("project backend has no qa_team environment");
            i.request
                .method("GET")
                .path("/environments/environment")
                .query_param("project", "backend")
                .query_param("environment", "qa_team")
                .header("authorization", BEARER);
            i.response
                .status(404)
                .header("content-type", "application/json")
                .json_body(json!({"messages": ["Environment not found"], "success": false}));
            i
        })
        .interaction("create an environment", "", |mut i| {
            i.given("project backend has no qa_team environment");
            i.request
                .method("POST")
                .path("/environments")
                .header("authorization", BEARER)
                .json_body(json!({"project": "backend", "name": "QA Team", "slug": "qa_team"}));
            i.response
                .status(200)
                .header("content-type", "application/json")
                .json_body(json!({
                    "environment": {
                        "id": "qa_team",
                        "slug": "qa_team",
                        "name": "QA Team",
                        "project": "backend"
                    },
                    "success": true
                }));
            i
        });

    let mock_server = pact_builder.start_mock_server(None, None);
    let ops = Environments::new(client_for(mock_server.url().as_str()));
    let environment =
        EnvironmentRef::new("backend", Some("QA Team".to_string()), None).expect("valid environment");

    let result = reconcile(&ops, &environment, &(), State::Present)
        .await
        .expect("reconcile should succeed");

    assert!(result.changed);
    assert_eq!(result.action, Action::Create);
    assert_eq!(
        result.resource.expect("created environment")["environment"]["slug"],
        "qa_team"
    );
}

#[tokio::test]
async fn test_existing_environment_is_unchanged_contract() {
    init_rustls();
    let mut pact_builder = PactBuilder::new("dopplerctl", "Doppler-API");

    pact_builder.interaction("fetch an existing environment", "", |mut i| {
        i.given("project backend has a dev environment");
        i.request
            .method("GET")
            .path("/environments/environment")
            .query_param("project", "backend")
            .query_param("environment", "dev")
            .header("authorization", BEARER);
        i.response
            .status(200)
            .header("content-type", "application/json")
            .json_body(json!({
                "environment": {"slug": "dev", "name": "Development", "project": "backend"},
                "success": true
            }));
        i
    });

    let mock_server = pact_builder.start_mock_server(None, None);
    let ops = Environments::new(client_for(mock_server.url().as_str()));
    let environment =
        EnvironmentRef::new("backend", None, Some("dev".to_string())).expect("valid environment");

    let result = reconcile(&ops, &environment, &(), State::Present)
        .await
        .expect("reconcile should succeed");

    assert!(!result.changed);
    assert_eq!(result.action, Action::Unchanged);
}

#[tokio::test]
async fn test_delete_environment_contract() {
    init_rustls();
    let mut pact_builder = PactBuilder::new("dopplerctl", "Doppler-API");

    pact_builder
        .interaction("fetch an environment to delete", "", |mut i| {
            i.given("project backend has a qa_team environment");
            i.request
                .method("GET")
                .path("/environments/environment")
                .query_param("project", "backend")
                .query_param("environment", "qa_team")
                .header("authorization", BEARER);
            i.response
                .status(200)
                .header("content-type", "application/json")
                .json_body(json!({
                    "environment": {"slug": "qa_team", "name": "QA Team", "project": "backend"},
                    "success": true
                }));
            i
        })
        .interaction("delete an environment", "", |mut i| {
            i.given("project backend has a qa_team environment");
            i.request
                .method("DELETE")
                .path("/environments/environment")
                .header("authorization", BEARER)
                .json_body(json!({"project": "backend", "environment": "qa_team"}));
            i.response
                .status(200)
                .header("content-type", "application/json")
                .json_body(json!({"success": true}));
            i
        });

    let mock_server = pact_builder.start_mock_server(None, None);
    let ops = Environments::new(client_for(mock_server.url().as_str()));
    let environment =
        EnvironmentRef::new("backend", None, Some("qa_team".to_string())).expect("valid environment");

    let result = reconcile(&ops, &environment, &(), State::Absent)
        .await
        .expect("reconcile should succeed");

    assert!(result.changed);
    assert_eq!(result.action, Action::Delete);
}

#[tokio::test]
async fn test_absent_environment_already_missing_contract() {
    init_rustls();
    let mut pact_builder = PactBuilder::new("dopplerctl", "Doppler-API");

    pact_builder.interaction("fetch an environment that was never created", "", |mut i| {
        i.given("project backend has no staging environment");
        i.request
            .method("GET")
            .path("/environments/environment")
            .query_param("project", "backend")
            .query_param("environment", "staging")
            .header("authorization", BEARER);
        i.response
            .status(404)
            .header("content-type", "application/json")
            .json_body(json!({"messages": ["Environment not found"], "success": false}));
        i
    });

    // Any DELETE would be an unexpected request and fail the mock server
    let mock_server = pact_builder.start_mock_server(None, None);
    let ops = Environments::new(client_for(mock_server.url().as_str()));
    let environment =
        EnvironmentRef::new("backend", Some("Staging".to_string()), None).expect("valid environment");

    let result = reconcile(&ops, &environment, &(), State::Absent)
        .await
        .expect("reconcile should succeed");

    assert!(!result.changed);
    assert_eq!(result.action, Action::AlreadyAbsent);
    assert_eq!(result.resource, None);
}

#[tokio::test]
async fn test_check_mode_only_fetches_contract() {
    init_rustls();
    let mut pact_builder = PactBuilder::new("dopplerctl", "Doppler-API");

    pact_builder.interaction("fetch an environment in check mode", "", |mut i| {
        i.given("project backend has a qa_team environment");
        i.request
            .method("GET")
            .path("/environments/environment")
            .query_param("project", "backend")
            .query_param("environment", "qa_team")
            .header("authorization", BEARER);
        i.response
            .status(200)
            .header("content-type", "application/json")
            .json_body(json!({
                "environment": {"slug": "qa_team", "name": "QA Team", "project": "backend"},
                "success": true
            }));
        i
    });

    let mock_server = pact_builder.start_mock_server(None, None);
    let ops = Environments::new(client_for(mock_server.url().as_str()));
    let environment =
        EnvironmentRef::new("backend", None, Some("qa_team".to_string())).expect("valid environment");

    let result = preview(&ops, &environment, &(), State::Absent)
        .await
        .expect("preview should succeed");

    assert!(!result.changed);
    assert_eq!(result.action, Action::Delete);
}

#[tokio::test]
async fn test_list_environments_contract() {
    init_rustls();
    let mut pact_builder = PactBuilder::new("dopplerctl", "Doppler-API");

    pact_builder.interaction("list environments of a project", "", |mut i| {
        i.given("project backend has dev and prd environments");
        i.request
            .method("GET")
            .path("/environments")
            .query_param("project", "backend")
            .header("authorization", BEARER);
        i.response
            .status(200)
            .header("content-type", "application/json")
            .json_body(json!({
                "environments": [
                    {"slug": "dev", "name": "Development"},
                    {"slug": "prd", "name": "Production"}
                ],
                "page": 1,
                "success": true
            }));
        i
    });

    let mock_server = pact_builder.start_mock_server(None, None);
    let ops = Environments::new(client_for(mock_server.url().as_str()));

    let listed = ops.list("backend").await.expect("list should succeed");

    assert_eq!(listed["environments"][0]["slug"], "dev");
    assert_eq!(listed["status_code"], 200);
}
