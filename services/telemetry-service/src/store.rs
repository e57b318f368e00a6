use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio_postgres::{Client, NoTls};

use crate::db::{self, InsertStatement};
use crate::error::StoreError;

/// Append-only sink for telemetry rows.
#[async_trait]
pub trait TelemetryStore: Send + Sync {
    async fn execute(&self, statement: InsertStatement) -> Result<u64, StoreError>;

    /// Runs every statement in one transaction; either all rows land or none do.
    async fn execute_atomically(&self, statements: Vec<InsertStatement>) -> Result<u64, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}

pub struct PgStore {
    db: Arc<Mutex<Client>>,
}

impl PgStore {
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let (db, connection) = tokio_postgres::connect(database_url, NoTls).await?;
        tokio::spawn(async move {
            // Drive the connection in the background.
            if let Err(err) = connection.await {
                tracing::error!(error = %err, "database connection error");
            }
        });
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
        })
    }

    // There is no reconnect; once closed, /readyz fails until a restart.
    fn ensure_open(db: &Client) -> Result<(), StoreError> {
        if db.is_closed() {
            return Err(StoreError::Unavailable(
                "database connection closed".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl TelemetryStore for PgStore {
    async fn execute(&self, statement: InsertStatement) -> Result<u64, StoreError> {
        let db = self.db.lock().await;
        Self::ensure_open(&db)?;
        Ok(db::execute_insert(&*db, &statement).await?)
    }

    async fn execute_atomically(&self, statements: Vec<InsertStatement>) -> Result<u64, StoreError> {
        let mut db = self.db.lock().await;
        Self::ensure_open(&db)?;
        let transaction = db.transaction().await?;

        let mut inserted = 0u64;
        for statement in &statements {
            // An early return drops the transaction, which rolls it back.
            inserted += db::execute_insert(&transaction, statement)
                .await
                .map_err(|err| {
                    tracing::warn!(
                        table = statement.table(),
                        batch = statements.len(),
                        error = %err,
                        "insert failed, rolling back"
                    );
                    err
                })?;
        }
        transaction.commit().await?;
        Ok(inserted)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let db = self.db.lock().await;
        Self::ensure_open(&db)?;
        Ok(db::ping(&*db).await?)
    }
}

#[cfg(test)]
pub mod memory {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::TelemetryStore;
    use crate::db::InsertStatement;
    use crate::error::StoreError;

    /// In-process store used by handler tests; can be told to reject a row.
    #[derive(Default)]
    pub struct MemoryStore {
        rows: Mutex<Vec<InsertStatement>>,
        reject_question: Option<i64>,
        offline: bool,
    }

    impl MemoryStore {
        /// Rejects any answer row with this question number, like a constraint violation.
        pub fn rejecting_question(question_number: i64) -> Self {
            Self {
                reject_question: Some(question_number),
                ..Self::default()
            }
        }

        pub fn offline() -> Self {
            Self {
                offline: true,
                ..Self::default()
            }
        }

        pub fn rows(&self) -> Vec<InsertStatement> {
            self.rows.lock().unwrap().clone()
        }

        pub fn count(&self, table: &str) -> usize {
            self.rows
                .lock()
                .unwrap()
                .iter()
                .filter(|row| row.table() == table)
                .count()
        }

        fn check(&self, statement: &InsertStatement) -> Result<(), StoreError> {
            if self.offline {
                return Err(StoreError::Unavailable("connection refused".to_string()));
            }
            if let InsertStatement::Answer { answer, .. } = statement {
                if Some(answer.question_number) == self.reject_question {
                    return Err(StoreError::Unavailable(format!(
                        "duplicate key value violates unique constraint for question {}",
                        answer.question_number
                    )));
                }
            }
            Ok(())
        }
    }

    #[async_trait]
    impl TelemetryStore for MemoryStore {
        async fn execute(&self, statement: InsertStatement) -> Result<u64, StoreError> {
            self.check(&statement)?;
            self.rows.lock().unwrap().push(statement);
            Ok(1)
        }

        async fn execute_atomically(
            &self,
            statements: Vec<InsertStatement>,
        ) -> Result<u64, StoreError> {
            for statement in &statements {
                self.check(statement)?;
            }
            let inserted = statements.len() as u64;
            self.rows.lock().unwrap().extend(statements);
            Ok(inserted)
        }

        async fn ping(&self) -> Result<(), StoreError> {
            if self.offline {
                return Err(StoreError::Unavailable("connection refused".to_string()));
            }
            Ok(())
        }
    }
}
