use uuid::Uuid;

use crate::{error::AppError, storage::db::SurrealDbClient, stored_object};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Running => "running",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStatus::Completed | RunStatus::Failed)
    }
}

stored_object!(IngestionRun, "ingestion_run", {
    started_at: DateTime<Utc>,
    #[serde(
        serialize_with = "serialize_option_datetime",
        deserialize_with = "deserialize_option_datetime",
        default
    )]
    completed_at: Option<DateTime<Utc>>,
    status: RunStatus,
    total_chunks: usize,
    total_files: usize,
    error_message: Option<String>,
    metadata: serde_json::Value
});

impl IngestionRun {
    /// Creates the run record in `running` state. The `running` row acts as
    /// a soft lock: a second run against the same collection is rejected
    /// until the first reaches a terminal state.
    pub async fn begin(
        db: &SurrealDbClient,
        metadata: serde_json::Value,
    ) -> Result<Self, AppError> {
        if let Some(active) = Self::find_active(db).await? {
            return Err(AppError::Validation(format!(
                "ingestion run {} is already active; wait for it to finish or mark it failed",
                active.id
            )));
        }

        let now = Utc::now();
        let run = Self {
            id: Uuid::new_v4().to_string(),
            created_at: now,
            updated_at: now,
            started_at: now,
            completed_at: None,
            status: RunStatus::Running,
            total_chunks: 0,
            total_files: 0,
            error_message: None,
            metadata,
        };

        db.store_item(run.clone()).await?;
        Ok(run)
    }

    pub async fn find_active(db: &SurrealDbClient) -> Result<Option<Self>, AppError> {
        let mut response = db
            .client
            .query(format!(
                "SELECT * FROM {} WHERE status = 'running' LIMIT 1",
                Self::table_name()
            ))
            .await?;
        let runs: Vec<Self> = response.take(0)?;
        Ok(runs.into_iter().next())
    }

    pub async fn complete(
        self,
        db: &SurrealDbClient,
        total_chunks: usize,
        total_files: usize,
    ) -> Result<Self, AppError> {
        self.finish(db, RunStatus::Completed, total_chunks, total_files, None)
            .await
    }

    pub async fn fail(
        self,
        db: &SurrealDbClient,
        total_chunks: usize,
        total_files: usize,
        error_message: String,
    ) -> Result<Self, AppError> {
        self.finish(
            db,
            RunStatus::Failed,
            total_chunks,
            total_files,
            Some(error_message),
        )
        .await
    }

    /// A run transitions out of `running` exactly once; the record is
    /// append-only afterwards.
    async fn finish(
        mut self,
        db: &SurrealDbClient,
        status: RunStatus,
        total_chunks: usize,
        total_files: usize,
        error_message: Option<String>,
    ) -> Result<Self, AppError> {
        if self.status.is_terminal() {
            return Err(AppError::InternalError(format!(
                "ingestion run {} already finished as {}",
                self.id,
                self.status.as_str()
            )));
        }

        let now = Utc::now();
        self.status = status;
        self.completed_at = Some(now);
        self.updated_at = now;
        self.total_chunks = total_chunks;
        self.total_files = total_files;
        self.error_message = error_message;

        db.upsert_item(self.clone()).await?;
        Ok(self)
    }
}
