//! # Result Reporting
//!
//! Shapes the JSON document printed at the end of an invocation.
//!
//! Success: `{"changed": bool, "action": "...", ...resource fields}`.
//! Failure: `{"failed": true, "msg": "...", "request": {...}, "status_code": n, "body": ...}`.

use crate::error::DopplerError;
use crate::reconciler::ReconciliationResult;
use serde_json::{json, Map, Value};

/// Flatten a reconciliation result into a single object
#[must_use]
pub fn success(result: &ReconciliationResult) -> Value {
    let mut report = match &result.resource {
        Some(Value::Object(fields)) => fields.clone(),
        Some(other) => {
            let mut map = Map::new();
            map.insert("resource".to_string(), other.clone());
            map
        }
        None => Map::new(),
    };
    report.insert("changed".to_string(), Value::Bool(result.changed));
    report.insert("action".to_string(), json!(result.action));
    Value::Object(report)
}

/// A list read never changes anything
#[must_use]
pub fn listing(collection: Value) -> Value {
    let mut report = match collection {
        Value::Object(fields) => fields,
        other => {
            let mut map = Map::new();
            map.insert("resources".to_string(), other);
            map
        }
    };
    report.insert("changed".to_string(), Value::Bool(false));
    Value::Object(report)
}

#[must_use]
pub fn failure(err: &DopplerError) -> Value {
    let mut report = Map::new();
    report.insert("failed".to_string(), Value::Bool(true));
    report.insert("changed".to_string(), Value::Bool(false));
    report.insert("msg".to_string(), Value::from(err.to_string()));
    if let Some(request) = err.request() {
        report.insert("request".to_string(), json!(request));
    }
    if let Some(status) = err.status() {
        report.insert("status_code".to_string(), Value::from(status));
    }
    if let Some(body) = err.body() {
        report.insert("body".to_string(), body.clone());
    }
    Value::Object(report)
}

/// One-line description of a failure for the log. Leaves out request and
/// response bodies, which may hold secret values.
#[must_use]
pub fn log_line(err: &DopplerError) -> String {
    match (err.request(), err.status()) {
        (Some(request), Some(status)) => {
            format!("{} {} answered HTTP {status}", request.method, request.url)
        }
        (Some(request), None) => match err {
            DopplerError::Timeout { timeout, .. } => format!(
                "{} {} timed out after {}s",
                request.method,
                request.url,
                timeout.as_secs()
            ),
            _ => format!("{} {} failed", request.method, request.url),
        },
        (None, _) => err.to_string(),
    }
}
