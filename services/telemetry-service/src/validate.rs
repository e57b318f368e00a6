use serde_json::{Map, Value};

use crate::error::ServiceError;
use crate::models::{Answer, CommonFields, TestResult, TraitScore, Traits, TRAIT_KEYS};

const INVALID_PAYLOAD: &str = "Invalid payload";
const DEFAULT_ANSWER_LABEL: &str = "N/A";

pub type Payload = Map<String, Value>;

pub fn validate_common(payload: &Payload) -> Result<CommonFields, ServiceError> {
    Ok(CommonFields {
        user_id: required_string(payload, "userId")?,
        session_id: required_string(payload, "sessionId")?,
        timestamp: required_string(payload, "timestamp")?,
    })
}

fn required_string(payload: &Payload, key: &str) -> Result<String, ServiceError> {
    match payload.get(key) {
        Some(Value::String(value)) => Ok(value.clone()),
        Some(_) => Err(ServiceError::validation(
            INVALID_PAYLOAD,
            format!("{key} must be a string"),
        )),
        None => Err(ServiceError::validation(
            INVALID_PAYLOAD,
            format!("{key} is required"),
        )),
    }
}

/// True when all five trait dimensions are present and in range.
pub fn validate_traits(traits: &Value) -> bool {
    parse_traits(traits).is_some()
}

fn parse_traits(traits: &Value) -> Option<Traits> {
    let traits = traits.as_object()?;
    let score = |key: &str| parse_trait_score(traits.get(key)?);
    Some(Traits {
        mind: score("mind")?,
        energy: score("energy")?,
        nature: score("nature")?,
        tactics: score("tactics")?,
        identity: score("identity")?,
    })
}

fn parse_trait_score(value: &Value) -> Option<TraitScore> {
    let percent = value.get("percent")?.as_f64()?;
    if !(0.0..=100.0).contains(&percent) {
        return None;
    }
    let label = value.get("type")?.as_str()?.trim();
    if label.is_empty() {
        return None;
    }
    Some(TraitScore {
        percent,
        label: label.to_string(),
    })
}

/// Validates every answer before anything is written; the first bad item fails the batch.
pub fn validate_answers(answers: Option<&Value>) -> Result<Vec<Answer>, ServiceError> {
    let items = match answers {
        Some(Value::Array(items)) if !items.is_empty() => items,
        _ => {
            return Err(ServiceError::validation(
                INVALID_PAYLOAD,
                "answers must be a non-empty array",
            ))
        }
    };

    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            validate_answer(item).map_err(|reason| {
                ServiceError::validation(
                    "Invalid answer",
                    format!("answer at index {index}: {reason}"),
                )
            })
        })
        .collect()
}

fn validate_answer(item: &Value) -> Result<Answer, &'static str> {
    let item = item.as_object().ok_or("answer must be an object")?;

    let question_number = match item.get("question_number") {
        None | Some(Value::Null) => return Err("question_number is required"),
        Some(value) => value.as_i64().ok_or("question_number must be an integer")?,
    };

    let question_text = match item.get("question_text") {
        Some(Value::String(text)) if !text.is_empty() => text.clone(),
        _ => return Err("question_text is required"),
    };

    // Only a missing key is rejected; null, 0 and "" are legitimate answers.
    let answer_value = match item.get("answer_value") {
        None => return Err("answer_value is required"),
        Some(Value::Null) => None,
        Some(Value::String(value)) => Some(value.clone()),
        Some(value @ (Value::Number(_) | Value::Bool(_))) => Some(value.to_string()),
        Some(_) => return Err("answer_value must be a scalar"),
    };

    let answer_label = match item.get("answer_label") {
        None | Some(Value::Null) => DEFAULT_ANSWER_LABEL.to_string(),
        Some(Value::String(label)) if label.is_empty() => DEFAULT_ANSWER_LABEL.to_string(),
        Some(Value::String(label)) => label.clone(),
        Some(_) => return Err("answer_label must be a string"),
    };

    Ok(Answer {
        question_number,
        question_text,
        answer_value,
        answer_label,
    })
}

pub fn validate_test_result(
    payload: &Payload,
    profile_prefix: &str,
) -> Result<TestResult, ServiceError> {
    let profile_url = match payload.get("profileUrl") {
        Some(Value::String(url)) if url.starts_with(profile_prefix) => url.clone(),
        _ => {
            return Err(ServiceError::validation(
                "Invalid profile URL",
                format!("profileUrl must start with {profile_prefix}"),
            ))
        }
    };

    let mbti_result = match payload.get("mbtiResult") {
        Some(Value::String(result)) if !result.trim().is_empty() => result.clone(),
        _ => {
            return Err(ServiceError::validation(
                INVALID_PAYLOAD,
                "mbtiResult must be a non-empty string",
            ))
        }
    };

    let mbti_code = match payload.get("mbtiCode") {
        None | Some(Value::Null) => None,
        Some(Value::String(code)) => Some(code.clone()),
        Some(_) => {
            return Err(ServiceError::validation(
                INVALID_PAYLOAD,
                "mbtiCode must be a string",
            ))
        }
    };

    let traits = payload.get("traits").and_then(parse_traits).ok_or_else(|| {
        ServiceError::validation(
            "Invalid traits",
            format!(
                "traits must contain {} with percent in [0, 100] and a non-empty type",
                TRAIT_KEYS.join(", ")
            ),
        )
    })?;

    Ok(TestResult {
        profile_url,
        mbti_result,
        mbti_code,
        traits,
    })
}
