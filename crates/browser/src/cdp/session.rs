//! CDP Session - one page target attached over the shared browser connection
//!
//! All sessions share the same WebSocket - no per-session connection overhead.

use super::client::{CDPClient, CDPError, EventCallback, Result};
use super::protocol::{
    AttachToTargetResult, CDPEvent, CreateTargetResult, NavigateResult, SessionId, TargetId,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Domains every page session needs for navigation and evaluation
const DEFAULT_DOMAINS: &[&str] = &["Page", "Runtime"];

const DOM_CONTENT_EVENT: &str = "Page.domContentEventFired";

/// CDP Session bound to a specific target
#[derive(Clone)]
pub struct CDPSession {
    /// Shared CDP client
    client: Arc<CDPClient>,

    /// Target this session is attached to
    pub target_id: TargetId,

    /// Session ID assigned by Chrome
    pub session_id: SessionId,
}

impl CDPSession {
    /// Create a blank page target and attach to it
    pub async fn create(client: Arc<CDPClient>) -> Result<Self> {
        let result = client
            .send_request(
                "Target.createTarget",
                Some(json!({ "url": "about:blank" })),
                None,
            )
            .await?;
        let created: CreateTargetResult = serde_json::from_value(result)?;

        Self::attach(client, created.target_id, None).await
    }

    /// Attach to a target and create session
    pub async fn attach(
        client: Arc<CDPClient>,
        target_id: TargetId,
        domains: Option<Vec<&str>>,
    ) -> Result<Self> {
        let result = client
            .send_request(
                "Target.attachToTarget",
                Some(json!({
                    "targetId": target_id,
                    "flatten": true,
                })),
                None,
            )
            .await?;

        let attach_result: AttachToTargetResult = serde_json::from_value(result)?;
        let session_id = attach_result.session_id;

        let domains = domains.unwrap_or_else(|| DEFAULT_DOMAINS.to_vec());

        // Events are only delivered for enabled domains, so these must all succeed
        let enable_futures: Vec<_> = domains
            .into_iter()
            .map(|domain| {
                let client = client.clone();
                let session_id = session_id.clone();
                async move {
                    client
                        .send_request(format!("{}.enable", domain), None, Some(session_id))
                        .await
                }
            })
            .collect();

        for result in futures_util::future::join_all(enable_futures).await {
            result?;
        }

        tracing::debug!(%target_id, %session_id, "Attached to page target");

        Ok(Self {
            client,
            target_id,
            session_id,
        })
    }

    /// Send command within this session's context
    pub async fn send(&self, method: impl Into<String>, params: Option<Value>) -> Result<Value> {
        self.client
            .send_request(method, params, Some(self.session_id.clone()))
            .await
    }

    /// Navigate to URL
    pub async fn navigate(&self, url: impl Into<String>) -> Result<NavigateResult> {
        let result = self
            .send("Page.navigate", Some(json!({ "url": url.into() })))
            .await?;
        Ok(serde_json::from_value(result)?)
    }

    /// Navigate and wait until the document is parsed (`DOMContentLoaded`).
    ///
    /// Subresources and network idle are not awaited.
    pub async fn navigate_until_dom_content_loaded(&self, url: &str) -> Result<()> {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let session_id = self.session_id.clone();
        let callback: EventCallback = Arc::new(move |event: CDPEvent| {
            if event.session_id.as_deref() == Some(session_id.as_str()) {
                let _ = tx.send(());
            }
        });

        // Only the subscriber list owns the sender, so a dropped connection ends the wait
        let registered = Arc::downgrade(&callback);
        self.client.subscribe(DOM_CONTENT_EVENT, callback);
        let outcome = async {
            let result = self.navigate(url).await?;
            if let Some(error_text) = result.error_text {
                return Err(CDPError::Navigation(error_text));
            }
            rx.recv().await.ok_or(CDPError::Closed)
        }
        .await;
        if let Some(callback) = registered.upgrade() {
            self.client.unsubscribe(DOM_CONTENT_EVENT, &callback);
        }

        outcome
    }

    /// Evaluate JavaScript and return its value
    pub async fn evaluate(&self, expression: impl Into<String>) -> Result<Value> {
        let result = self
            .send(
                "Runtime.evaluate",
                Some(json!({
                    "expression": expression.into(),
                    "returnByValue": true,
                    "awaitPromise": true,
                })),
            )
            .await?;

        evaluation_value(result)
    }

    /// Close the page target
    pub async fn close(&self) -> Result<()> {
        self.client
            .send_request(
                "Target.closeTarget",
                Some(json!({ "targetId": &self.target_id })),
                None,
            )
            .await?;
        Ok(())
    }
}

/// Unwrap a `Runtime.evaluate` result, surfacing thrown exceptions
fn evaluation_value(result: Value) -> Result<Value> {
    if let Some(exception) = result.get("exceptionDetails") {
        let message = exception
            .get("exception")
            .and_then(|e| e.get("description"))
            .and_then(Value::as_str)
            .or_else(|| exception.get("text").and_then(Value::as_str))
            .unwrap_or("unknown exception")
            .to_string();
        return Err(CDPError::Evaluation(message));
    }

    Ok(result
        .get("result")
        .and_then(|r| r.get("value"))
        .cloned()
        .unwrap_or(Value::Null))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evaluation_value_extracts_value() {
        let value = evaluation_value(json!({
            "result": { "type": "object", "value": [{ "rank": "1." }] }
        }))
        .unwrap();
        assert_eq!(value, json!([{ "rank": "1." }]));
    }

    #[test]
    fn test_evaluation_value_undefined_is_null() {
        let value = evaluation_value(json!({ "result": { "type": "undefined" } })).unwrap();
        assert_eq!(value, Value::Null);
    }

    #[test]
    fn test_evaluation_value_surfaces_exception() {
        let err = evaluation_value(json!({
            "result": { "type": "object", "subtype": "error" },
            "exceptionDetails": {
                "text": "Uncaught",
                "exception": { "description": "TypeError: rows is not iterable" }
            }
        }))
        .unwrap_err();
        assert!(matches!(err, CDPError::Evaluation(m) if m == "TypeError: rows is not iterable"));
    }

    #[test]
    fn test_evaluation_value_falls_back_to_text() {
        let err = evaluation_value(json!({
            "result": {},
            "exceptionDetails": { "text": "Uncaught SyntaxError" }
        }))
        .unwrap_err();
        assert!(matches!(err, CDPError::Evaluation(m) if m == "Uncaught SyntaxError"));
    }
}
