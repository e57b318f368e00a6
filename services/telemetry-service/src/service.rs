use axum::http::StatusCode;
use serde_json::Value;

use crate::config::ServiceConfig;
use crate::db::InsertStatement;
use crate::error::{ServiceError, StoreError};
use crate::models::{CommonFields, EventName, PayloadType};
use crate::store::TelemetryStore;
use crate::validate::{validate_answers, validate_common, validate_test_result, Payload};

const INVALID_PAYLOAD_TYPE: &str = "Invalid payload type";

/// A validated request, already turned into the rows it will write.
#[derive(Debug)]
pub struct Submission {
    pub kind: PayloadType,
    pub common: CommonFields,
    pub statements: Vec<InsertStatement>,
}

#[derive(Debug, PartialEq, Eq)]
pub struct Accepted {
    pub status: StatusCode,
    pub message: &'static str,
}

pub fn parse_body(body: &[u8]) -> Result<Payload, ServiceError> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|err| ServiceError::validation("Invalid JSON body", err.to_string()))?;
    match value {
        Value::Object(payload) => Ok(payload),
        _ => Err(ServiceError::validation(
            "Invalid payload",
            "request body must be a JSON object",
        )),
    }
}

/// Picks the payload type; `expected` pins it for single-type endpoints.
pub fn resolve_type(
    payload: &Payload,
    expected: Option<PayloadType>,
) -> Result<PayloadType, ServiceError> {
    let declared = match payload.get("type") {
        None | Some(Value::Null) => None,
        Some(Value::String(name)) => Some(PayloadType::parse(name).ok_or_else(|| {
            ServiceError::validation(INVALID_PAYLOAD_TYPE, format!("unsupported type: {name}"))
        })?),
        Some(_) => {
            return Err(ServiceError::validation(
                INVALID_PAYLOAD_TYPE,
                "type must be a string",
            ))
        }
    };

    match (declared, expected) {
        (Some(declared), Some(expected)) if declared != expected => Err(ServiceError::validation(
            INVALID_PAYLOAD_TYPE,
            format!(
                "type {} sent to the {} endpoint",
                declared.as_str(),
                expected.as_str()
            ),
        )),
        (Some(kind), _) | (None, Some(kind)) => Ok(kind),
        (None, None) => Err(ServiceError::validation(
            INVALID_PAYLOAD_TYPE,
            "type is required",
        )),
    }
}

/// Validates the whole payload and builds every statement before any is run.
pub fn plan(
    payload: &Payload,
    expected: Option<PayloadType>,
    config: &ServiceConfig,
) -> Result<Submission, ServiceError> {
    let kind = resolve_type(payload, expected)?;
    let common = validate_common(payload)?;
    let statements = match kind {
        PayloadType::Event => vec![InsertStatement::event(common.clone(), event_name(payload)?)],
        PayloadType::Answers => validate_answers(payload.get("answers"))?
            .into_iter()
            .map(|answer| InsertStatement::Answer {
                common: common.clone(),
                answer,
            })
            .collect(),
        PayloadType::Result => vec![InsertStatement::Result {
            common: common.clone(),
            result: validate_test_result(payload, &config.profile_url_prefix)?,
        }],
    };

    Ok(Submission {
        kind,
        common,
        statements,
    })
}

fn event_name(payload: &Payload) -> Result<EventName, ServiceError> {
    let name = payload.get("eventName").and_then(Value::as_str);
    name.and_then(EventName::parse).ok_or_else(|| {
        ServiceError::validation(
            INVALID_PAYLOAD_TYPE,
            format!("unsupported eventName: {}", name.unwrap_or("<missing>")),
        )
    })
}

/// Writes a planned submission. Answers always go through one transaction.
pub async fn commit(
    store: &dyn TelemetryStore,
    submission: Submission,
) -> Result<Accepted, ServiceError> {
    let Submission {
        kind,
        common,
        statements,
    } = submission;
    let attempted = statements.len();

    let outcome = match kind {
        PayloadType::Answers => store.execute_atomically(statements).await,
        PayloadType::Event | PayloadType::Result => execute_each(store, statements).await,
    };

    match outcome {
        Ok(rows) => {
            tracing::info!(
                payload_type = kind.as_str(),
                user_id = common.user_id.as_str(),
                session_id = common.session_id.as_str(),
                rows,
                "telemetry stored"
            );
            Ok(accepted(kind))
        }
        Err(err) => {
            tracing::error!(
                payload_type = kind.as_str(),
                user_id = common.user_id.as_str(),
                session_id = common.session_id.as_str(),
                attempted,
                error = %err,
                "telemetry insert failed"
            );
            Err(ServiceError::persistence(failure_message(kind), &err))
        }
    }
}

async fn execute_each(
    store: &dyn TelemetryStore,
    statements: Vec<InsertStatement>,
) -> Result<u64, StoreError> {
    let mut inserted = 0u64;
    for statement in statements {
        inserted += store.execute(statement).await?;
    }
    Ok(inserted)
}

fn accepted(kind: PayloadType) -> Accepted {
    match kind {
        PayloadType::Event => Accepted {
            status: StatusCode::OK,
            message: "Event logged successfully",
        },
        PayloadType::Answers => Accepted {
            status: StatusCode::CREATED,
            message: "Answers saved successfully",
        },
        PayloadType::Result => Accepted {
            status: StatusCode::CREATED,
            message: "Result saved successfully",
        },
    }
}

fn failure_message(kind: PayloadType) -> &'static str {
    match kind {
        PayloadType::Event => "Failed to log event",
        PayloadType::Answers => "Failed to save answers",
        PayloadType::Result => "Failed to save result",
    }
}

/// parse → validate and build statements → execute.
pub async fn ingest(
    store: &dyn TelemetryStore,
    config: &ServiceConfig,
    body: &[u8],
    expected: Option<PayloadType>,
) -> Result<Accepted, ServiceError> {
    let submission = parse_body(body).and_then(|payload| plan(&payload, expected, config));
    let submission = match submission {
        Ok(submission) => submission,
        Err(err) => {
            tracing::warn!(
                kind = err.kind.as_str(),
                reason = err.message,
                detail = err.detail.as_deref().unwrap_or(""),
                "telemetry rejected"
            );
            return Err(err);
        }
    };
    commit(store, submission).await
}
