//! HTTP surface: thin handlers translating form posts into store operations.

use crate::config::ServerConfig;
use crate::error::VisitorError;
use crate::visitor::PresenceStore;
use axum::extract::rejection::FormRejection;
use axum::extract::{Form, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

#[derive(Clone)]
struct GatewayState {
    store: Arc<PresenceStore>,
}

#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInForm {
    full_name: Option<String>,
    company: Option<String>,
    mobile_number: Option<String>,
    site_contact: Option<String>,
}

impl SignInForm {
    fn into_fields(self) -> Result<(String, String, String, String), VisitorError> {
        Ok((
            required(self.full_name, "fullName")?,
            required(self.company, "company")?,
            required(self.mobile_number, "mobileNumber")?,
            required(self.site_contact, "siteContact")?,
        ))
    }
}

#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignOutForm {
    full_name: Option<String>,
}

/// Build the router for the visitor endpoints.
pub fn router(store: Arc<PresenceStore>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/visitor_names", get(visitor_names))
        .route("/submit_sign_in", post(submit_sign_in))
        .route("/submit_sign_out", post(submit_sign_out))
        .with_state(GatewayState { store })
}

/// Running HTTP listener.
pub struct VisitorServer {
    addr: SocketAddr,
    handle: tokio::task::JoinHandle<()>,
}

impl VisitorServer {
    /// Bind `host:port` and serve in a background task.
    ///
    /// # Errors
    ///
    /// Returns an error if the TCP listener cannot bind.
    pub async fn start(store: Arc<PresenceStore>, config: &ServerConfig) -> crate::Result<Self> {
        let bind_addr = format!("{}:{}", config.host, config.port);
        let listener = TcpListener::bind(&bind_addr)
            .await
            .map_err(|e| VisitorError::Io(format!("bind {bind_addr} failed: {e}")))?;
        let addr = listener
            .local_addr()
            .map_err(|e| VisitorError::Io(format!("failed to get local addr: {e}")))?;

        info!("visitor register listening on http://{addr}");

        let app = router(store);
        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!("visitor server error: {e}");
            }
        });

        Ok(Self { addr, handle })
    }

    /// Returns the address the server is listening on.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Wait for the server task to finish.
    pub async fn wait(&mut self) {
        match (&mut self.handle).await {
            Err(e) if !e.is_cancelled() => tracing::error!("visitor server task failed: {e}"),
            _ => {}
        }
    }

    /// Abort the server task.
    pub fn shutdown(&self) {
        self.handle.abort();
    }
}

impl Drop for VisitorServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "ok"
    }))
}

async fn visitor_names(State(state): State<GatewayState>) -> impl IntoResponse {
    Json(state.store.list_present().await)
}

async fn submit_sign_in(
    State(state): State<GatewayState>,
    form: Result<Form<SignInForm>, FormRejection>,
) -> impl IntoResponse {
    let Form(form) = match form {
        Ok(form) => form,
        Err(rejection) => return rejection_response(&rejection),
    };
    let (full_name, company, mobile_number, site_contact) = match form.into_fields() {
        Ok(fields) => fields,
        Err(e) => return error_response(&e),
    };

    match state
        .store
        .sign_in(&full_name, &company, &mobile_number, &site_contact)
        .await
    {
        Ok(_) => message(StatusCode::OK, "Sign in successful"),
        Err(e) => error_response(&e),
    }
}

async fn submit_sign_out(
    State(state): State<GatewayState>,
    form: Result<Form<SignOutForm>, FormRejection>,
) -> impl IntoResponse {
    let Form(form) = match form {
        Ok(form) => form,
        Err(rejection) => return rejection_response(&rejection),
    };
    let full_name = match required(form.full_name, "fullName") {
        Ok(name) => name,
        Err(e) => return error_response(&e),
    };

    match state.store.sign_out(&full_name).await {
        Ok(_) => message(StatusCode::OK, "Sign out successful"),
        Err(e) => error_response(&e),
    }
}

/// Blank values are rejected; others pass through untouched, since
/// `fullName` is the store key and stored names are never normalised.
fn required(value: Option<String>, field: &str) -> Result<String, VisitorError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| VisitorError::Validation(format!("{field} is required")))
}

fn message(status: StatusCode, text: impl Into<String>) -> (StatusCode, Json<serde_json::Value>) {
    (status, Json(json!({ "message": text.into() })))
}

fn rejection_response(rejection: &FormRejection) -> (StatusCode, Json<serde_json::Value>) {
    message(rejection.status(), rejection.body_text())
}

fn error_response(err: &VisitorError) -> (StatusCode, Json<serde_json::Value>) {
    match err {
        VisitorError::NotFound(_) => message(StatusCode::NOT_FOUND, "Visitor not found"),
        VisitorError::Validation(text) => message(StatusCode::BAD_REQUEST, text.as_str()),
        other => message(StatusCode::INTERNAL_SERVER_ERROR, other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    #[test]
    fn required_keeps_value_and_rejects_blank() {
        assert_eq!(
            required(Some(" Jane Doe".to_owned()), "fullName").unwrap(),
            " Jane Doe"
        );
        assert!(matches!(
            required(Some("   ".to_owned()), "fullName"),
            Err(VisitorError::Validation(_))
        ));
        let err = required(None, "siteContact").unwrap_err();
        assert_eq!(err.to_string(), "validation error: siteContact is required");
    }

    #[test]
    fn error_statuses_follow_contract() {
        assert_eq!(
            error_response(&VisitorError::NotFound("x".to_owned())).0,
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            error_response(&VisitorError::Validation("x".to_owned())).0,
            StatusCode::BAD_REQUEST
        );
        for err in [
            VisitorError::AlreadySignedOut("x".to_owned()),
            VisitorError::DuplicateActiveVisitor("x".to_owned()),
            VisitorError::Io("disk".to_owned()),
        ] {
            assert_eq!(error_response(&err).0, StatusCode::INTERNAL_SERVER_ERROR);
        }
    }

    #[test]
    fn not_found_uses_fixed_message() {
        let (_, Json(body)) = error_response(&VisitorError::NotFound("Jane".to_owned()));
        assert_eq!(body, json!({"message": "Visitor not found"}));
    }
}
