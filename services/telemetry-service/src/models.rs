use serde::Serialize;

pub const TRAIT_KEYS: [&str; 5] = ["mind", "energy", "nature", "tactics", "identity"];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PayloadType {
    Event,
    Answers,
    Result,
}

impl PayloadType {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "event" => Some(PayloadType::Event),
            "answers" => Some(PayloadType::Answers),
            "result" => Some(PayloadType::Result),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PayloadType::Event => "event",
            PayloadType::Answers => "answers",
            PayloadType::Result => "result",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventName {
    TestStarted,
    TestFinished,
}

impl EventName {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "test_started" => Some(EventName::TestStarted),
            "test_finished" => Some(EventName::TestFinished),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EventName::TestStarted => "test_started",
            EventName::TestFinished => "test_finished",
        }
    }
}

/// Identity and time fields required on every logging request.
#[derive(Clone, Debug, PartialEq)]
pub struct CommonFields {
    pub user_id: String,
    pub session_id: String,
    pub timestamp: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Answer {
    pub question_number: i64,
    pub question_text: String,
    /// `None` when the client sent an explicit null.
    pub answer_value: Option<String>,
    pub answer_label: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TraitScore {
    pub percent: f64,
    pub label: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Traits {
    pub mind: TraitScore,
    pub energy: TraitScore,
    pub nature: TraitScore,
    pub tactics: TraitScore,
    pub identity: TraitScore,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TestResult {
    pub profile_url: String,
    pub mbti_result: String,
    pub mbti_code: Option<String>,
    pub traits: Traits,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl MessageResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            error: None,
        }
    }
}

#[derive(Serialize)]
pub struct HelloResponse {
    pub message: &'static str,
    pub timestamp: String,
    pub environment: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerTime {
    pub iso: String,
    pub unix_seconds: i64,
    pub unix_millis: i64,
    pub rfc2822: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckTimeResponse {
    pub message: &'static str,
    pub server_time: ServerTime,
    pub timezone: &'static str,
    pub environment: String,
    pub service: &'static str,
    pub version: &'static str,
}
