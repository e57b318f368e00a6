use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::MessageResponse;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Method,
    Persistence,
}

impl ErrorKind {
    pub fn status(self) -> StatusCode {
        match self {
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::Method => StatusCode::METHOD_NOT_ALLOWED,
            ErrorKind::Persistence => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Method => "method",
            ErrorKind::Persistence => "persistence",
        }
    }
}

/// A failed request, tagged with its kind where the failure happened.
#[derive(Debug)]
pub struct ServiceError {
    pub kind: ErrorKind,
    pub message: &'static str,
    pub detail: Option<String>,
    pub allow: Option<&'static str>,
}

impl ServiceError {
    pub fn validation(message: &'static str, detail: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Validation,
            message,
            detail: Some(detail.into()),
            allow: None,
        }
    }

    pub fn method_not_allowed(allow: &'static str) -> Self {
        Self {
            kind: ErrorKind::Method,
            message: "Method not allowed",
            detail: Some(format!("allowed methods: {allow}")),
            allow: Some(allow),
        }
    }

    pub fn persistence(message: &'static str, err: &StoreError) -> Self {
        Self {
            kind: ErrorKind::Persistence,
            message,
            detail: Some(err.detail()),
            allow: None,
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let body = MessageResponse {
            message: self.message.to_string(),
            error: self.detail,
        };
        let mut response = (self.kind.status(), Json(body)).into_response();
        if let Some(allow) = self.allow {
            response
                .headers_mut()
                .insert(header::ALLOW, HeaderValue::from_static(allow));
        }
        response
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Postgres(#[from] tokio_postgres::Error),
    #[error("{0}")]
    Unavailable(String),
}

impl StoreError {
    /// Text passed back to the caller; prefers the server's own message.
    pub fn detail(&self) -> String {
        match self {
            StoreError::Postgres(err) => match err.as_db_error() {
                Some(db_err) => db_err.message().to_string(),
                None => err.to_string(),
            },
            StoreError::Unavailable(reason) => reason.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_map_to_status_codes() {
        assert_eq!(ErrorKind::Validation.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorKind::Method.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(
            ErrorKind::Persistence.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn method_error_carries_allow_header() {
        let response = ServiceError::method_not_allowed("POST, OPTIONS").into_response();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(
            response.headers().get(header::ALLOW).unwrap(),
            "POST, OPTIONS"
        );
    }

    #[test]
    fn persistence_error_passes_store_text_through() {
        let err = StoreError::Unavailable("connection reset".to_string());
        let service_err = ServiceError::persistence("Failed to log event", &err);
        assert_eq!(service_err.kind, ErrorKind::Persistence);
        assert_eq!(service_err.detail.as_deref(), Some("connection reset"));
    }
}
