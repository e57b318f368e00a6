use tokio_postgres::{types::ToSql, GenericClient};

use crate::models::{Answer, CommonFields, EventName, TestResult};

// Casts pin each parameter to its column type in schema.sql. answer_value is
// text, so numeric answers are stored as their JSON text, and the client's
// ISO-8601 timestamp is parsed into a timestamptz instant.
const SQL_INSERT_EVENT: &str = "INSERT INTO events (user_id, session_id, event_name, timestamp) \
VALUES ($1::text, $2::text, $3::text, $4::text::timestamptz)";
const SQL_INSERT_ANSWER: &str = "INSERT INTO answers \
(user_id, session_id, question_number, question_text, answer_value, answer_label, timestamp) \
VALUES ($1::text, $2::text, $3::int8, $4::text, $5::text, $6::text, $7::text::timestamptz)";
const SQL_INSERT_RESULT: &str = "INSERT INTO results \
(user_id, session_id, profile_url, mbti_result, mbti_code, \
mind_percent, mind_type, energy_percent, energy_type, nature_percent, nature_type, \
tactics_percent, tactics_type, identity_percent, identity_type, timestamp) \
VALUES ($1::text, $2::text, $3::text, $4::text, $5::text, \
$6::float8, $7::text, $8::float8, $9::text, $10::float8, $11::text, \
$12::float8, $13::text, $14::float8, $15::text, $16::text::timestamptz)";
const SQL_PING: &str = "SELECT 1";

/// One row to append, carrying everything its INSERT binds.
#[derive(Clone, Debug, PartialEq)]
pub enum InsertStatement {
    Event {
        common: CommonFields,
        event_name: &'static str,
    },
    Answer {
        common: CommonFields,
        answer: Answer,
    },
    Result {
        common: CommonFields,
        result: TestResult,
    },
}

impl InsertStatement {
    pub fn event(common: CommonFields, event: EventName) -> Self {
        InsertStatement::Event {
            common,
            event_name: event.as_str(),
        }
    }

    pub fn table(&self) -> &'static str {
        match self {
            InsertStatement::Event { .. } => "events",
            InsertStatement::Answer { .. } => "answers",
            InsertStatement::Result { .. } => "results",
        }
    }

    pub fn sql(&self) -> &'static str {
        match self {
            InsertStatement::Event { .. } => SQL_INSERT_EVENT,
            InsertStatement::Answer { .. } => SQL_INSERT_ANSWER,
            InsertStatement::Result { .. } => SQL_INSERT_RESULT,
        }
    }

    pub fn params(&self) -> Vec<&(dyn ToSql + Sync)> {
        match self {
            InsertStatement::Event { common, event_name } => vec![
                &common.user_id,
                &common.session_id,
                event_name,
                &common.timestamp,
            ],
            InsertStatement::Answer { common, answer } => vec![
                &common.user_id,
                &common.session_id,
                &answer.question_number,
                &answer.question_text,
                &answer.answer_value,
                &answer.answer_label,
                &common.timestamp,
            ],
            InsertStatement::Result { common, result } => {
                let traits = &result.traits;
                vec![
                    &common.user_id,
                    &common.session_id,
                    &result.profile_url,
                    &result.mbti_result,
                    &result.mbti_code,
                    &traits.mind.percent,
                    &traits.mind.label,
                    &traits.energy.percent,
                    &traits.energy.label,
                    &traits.nature.percent,
                    &traits.nature.label,
                    &traits.tactics.percent,
                    &traits.tactics.label,
                    &traits.identity.percent,
                    &traits.identity.label,
                    &common.timestamp,
                ]
            }
        }
    }
}

pub async fn execute_insert(
    db: &impl GenericClient,
    statement: &InsertStatement,
) -> Result<u64, tokio_postgres::Error> {
    db.execute(statement.sql(), &statement.params()).await
}

pub async fn ping(db: &impl GenericClient) -> Result<(), tokio_postgres::Error> {
    db.query_one(SQL_PING, &[]).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{TraitScore, Traits};

    fn common() -> CommonFields {
        CommonFields {
            user_id: "u1".to_string(),
            session_id: "s1".to_string(),
            timestamp: "2024-01-01T00:00:00Z".to_string(),
        }
    }

    fn placeholders(sql: &str) -> usize {
        (1..=32)
            .take_while(|index| sql.contains(&format!("${index}::")))
            .count()
    }

    fn score(percent: f64, label: &str) -> TraitScore {
        TraitScore {
            percent,
            label: label.to_string(),
        }
    }

    #[test]
    fn bound_params_match_placeholders() {
        let statements = vec![
            InsertStatement::event(common(), EventName::TestStarted),
            InsertStatement::Answer {
                common: common(),
                answer: Answer {
                    question_number: 1,
                    question_text: "Q1".to_string(),
                    answer_value: Some("3".to_string()),
                    answer_label: "N/A".to_string(),
                },
            },
            InsertStatement::Result {
                common: common(),
                result: TestResult {
                    profile_url: "https://www.16personalities.com/profiles/abcd".to_string(),
                    mbti_result: "INTJ Architect".to_string(),
                    mbti_code: None,
                    traits: Traits {
                        mind: score(60.0, "Introverted"),
                        energy: score(55.0, "Intuitive"),
                        nature: score(70.0, "Thinking"),
                        tactics: score(40.0, "Judging"),
                        identity: score(50.0, "Assertive"),
                    },
                },
            },
        ];

        for statement in &statements {
            assert_eq!(
                placeholders(statement.sql()),
                statement.params().len(),
                "{} insert",
                statement.table()
            );
        }
    }

    #[test]
    fn event_rows_bind_the_wire_name() {
        let statement = InsertStatement::event(common(), EventName::TestFinished);
        assert_eq!(statement.table(), "events");
        assert!(matches!(
            statement,
            InsertStatement::Event {
                event_name: "test_finished",
                ..
            }
        ));
    }

    const SCHEMA: &str = include_str!("../schema.sql");

    fn sql_type(cast: &str) -> &'static str {
        match cast {
            "text" => "text",
            "int8" => "bigint",
            "float8" => "double precision",
            "timestamptz" => "timestamptz",
            other => panic!("unmapped cast {other}"),
        }
    }

    /// Column name to declared type for one CREATE TABLE block.
    fn declared_columns(table: &str) -> Vec<(String, String)> {
        let header = format!("CREATE TABLE IF NOT EXISTS {table} (");
        let start = SCHEMA.find(&header).expect("table in schema") + header.len();
        let body = &SCHEMA[start..];
        let body = &body[..body.find(");").expect("closed table")];
        body.lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| {
                let (name, rest) = line.split_once(' ').expect("column line");
                let rest = rest.trim_end_matches(',');
                let declared = rest
                    .trim_end_matches(" PRIMARY KEY")
                    .trim_end_matches(" NOT NULL");
                (name.to_string(), declared.to_string())
            })
            .collect()
    }

    /// Pairs each inserted column with the final cast on its parameter.
    fn bound_columns(sql: &str) -> Vec<(String, String)> {
        let open = sql.find('(').unwrap();
        let close = sql.find(')').unwrap();
        let columns = sql[open + 1..close].split(',').map(|c| c.trim().to_string());
        let values = &sql[sql.find("VALUES (").unwrap() + "VALUES (".len()..sql.len() - 1];
        let casts = values
            .split(", ")
            .map(|param| param.rsplit("::").next().unwrap().to_string());
        columns.zip(casts).collect()
    }

    #[test]
    fn casts_match_declared_column_types() {
        for sql in [SQL_INSERT_EVENT, SQL_INSERT_ANSWER, SQL_INSERT_RESULT] {
            let table = sql["INSERT INTO ".len()..].split_whitespace().next().unwrap();
            let declared = declared_columns(table);
            let bound = bound_columns(sql);
            assert!(!bound.is_empty(), "{table}");
            for (column, cast) in bound {
                let (_, column_type) = declared
                    .iter()
                    .find(|(name, _)| *name == column)
                    .unwrap_or_else(|| panic!("{table}.{column} not declared"));
                assert_eq!(column_type, sql_type(&cast), "{table}.{column}");
            }
        }
    }
}
