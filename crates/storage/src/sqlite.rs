//! SQLite Store

use crate::model::{AnomalyId, BatchId, BatchStatus, HumanScores, ImportBatch, StoredAnomaly};
use crate::store::{AnomalyStore, StorageResult};
use crate::StorageError;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use data_validator::{AnomalyInput, Score, ScoreTriple};
use scoring::{Method, PredictionResult};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use std::str::FromStr;
use tracing::{debug, info, warn};

const CREATE_BATCHES: &str = "CREATE TABLE IF NOT EXISTS import_batches (
    id                TEXT PRIMARY KEY,
    filename          TEXT NOT NULL,
    total_records     INTEGER NOT NULL CHECK (total_records >= 0),
    processed_records INTEGER NOT NULL DEFAULT 0 CHECK (processed_records >= 0),
    status            TEXT NOT NULL
                      CHECK (status IN ('pending', 'processing', 'completed', 'failed')),
    error_message     TEXT,
    created_at        TEXT NOT NULL,
    completed_at      TEXT
)";

const ANOMALY_COLUMNS: &str = "
    id                    TEXT PRIMARY KEY,
    equipment_id          TEXT NOT NULL,
    system                TEXT NOT NULL,
    description           TEXT NOT NULL,
    detection_date        TEXT,
    equipment_description TEXT,
    owning_section        TEXT,
    ai_reliability        INTEGER NOT NULL CHECK (ai_reliability BETWEEN 1 AND 5),
    ai_availability       INTEGER NOT NULL CHECK (ai_availability BETWEEN 1 AND 5),
    ai_process_safety     INTEGER NOT NULL CHECK (ai_process_safety BETWEEN 1 AND 5),
    ai_criticality        INTEGER NOT NULL CHECK (ai_criticality BETWEEN 3 AND 15),
    method                TEXT NOT NULL CHECK (method IN ('statistical', 'rule-based')),
    human_reliability     INTEGER CHECK (human_reliability BETWEEN 1 AND 5),
    human_availability    INTEGER CHECK (human_availability BETWEEN 1 AND 5),
    human_process_safety  INTEGER CHECK (human_process_safety BETWEEN 1 AND 5),
    status                TEXT NOT NULL DEFAULT 'nouvelle',
    created_at            TEXT NOT NULL,";

const SELECT_ANOMALY: &str = "SELECT id, equipment_id, system, description, detection_date,
    equipment_description, owning_section, ai_reliability, ai_availability,
    ai_process_safety, ai_criticality, method, human_reliability, human_availability,
    human_process_safety, status, import_batch_id, created_at FROM anomalies";

/// Schema created by [`SqliteStore::connect`]
#[derive(Debug, Clone, Copy)]
pub struct SchemaOptions {
    /// Create the `import_batches` table and link anomalies to it
    pub batch_tracking: bool,
}

impl Default for SchemaOptions {
    fn default() -> Self {
        Self {
            batch_tracking: true,
        }
    }
}

/// SQLite-backed anomaly store
pub struct SqliteStore {
    pool: SqlitePool,
    batch_tracking: bool,
}

impl SqliteStore {
    /// Open (or create) the database at `url` and ensure the schema exists.
    ///
    /// In-memory databases use a single connection that is never recycled,
    /// otherwise every new connection would see an empty database.
    pub async fn connect(url: &str, options: SchemaOptions) -> StorageResult<Self> {
        let connect_options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let in_memory = url.contains(":memory:") || url.contains("mode=memory");
        let pool = SqlitePoolOptions::new()
            .max_connections(if in_memory { 1 } else { 5 })
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(connect_options)
            .await?;

        let store = Self {
            pool,
            batch_tracking: false,
        };
        store.migrate(options).await
    }

    async fn migrate(mut self, options: SchemaOptions) -> StorageResult<Self> {
        if options.batch_tracking {
            if let Err(e) = sqlx::query(CREATE_BATCHES).execute(&self.pool).await {
                warn!("Could not create import_batches table: {}", e);
            }
        }

        let batch_table: Option<String> = sqlx::query_scalar(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name = 'import_batches'",
        )
        .fetch_optional(&self.pool)
        .await?;
        self.batch_tracking = batch_table.is_some();

        // The foreign key is only declared when its target exists; SQLite
        // rejects every insert into a table whose parent table is missing.
        let batch_column = if self.batch_tracking {
            "import_batch_id TEXT REFERENCES import_batches(id)"
        } else {
            "import_batch_id TEXT"
        };
        let create_anomalies = format!(
            "CREATE TABLE IF NOT EXISTS anomalies ({}\n    {}\n)",
            ANOMALY_COLUMNS, batch_column
        );
        sqlx::query(&create_anomalies).execute(&self.pool).await?;
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_anomalies_batch ON anomalies (import_batch_id)",
        )
        .execute(&self.pool)
        .await?;

        info!(
            batch_tracking = self.batch_tracking,
            "SQLite anomaly store ready"
        );
        Ok(self)
    }

    /// Whether the batch table is present
    pub fn batch_tracking(&self) -> bool {
        self.batch_tracking
    }

    /// Close the pool
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl AnomalyStore for SqliteStore {
    async fn create_batch(&self, filename: &str, total_records: usize) -> StorageResult<BatchId> {
        let id = BatchId::new();
        let result = sqlx::query(
            "INSERT INTO import_batches (id, filename, total_records, processed_records, status, created_at)
             VALUES (?, ?, ?, 0, ?, ?)",
        )
        .bind(id.to_string())
        .bind(filename)
        .bind(count_to_i64(total_records))
        .bind(BatchStatus::Pending.as_str())
        .bind(timestamp(Utc::now()))
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => {
                debug!("Created import batch {} ({} records)", id, total_records);
                Ok(id)
            }
            Err(sqlx::Error::Database(db)) if db.message().contains("no such table") => Err(
                StorageError::BatchTrackingUnavailable(db.message().to_string()),
            ),
            Err(e) => Err(e.into()),
        }
    }

    async fn store_anomaly(
        &self,
        input: &AnomalyInput,
        prediction: &PredictionResult,
        batch_id: Option<&BatchId>,
    ) -> StorageResult<AnomalyId> {
        if batch_id.is_some() && !self.batch_tracking {
            return Err(StorageError::ConstraintViolation(
                "import_batch_id set but batch tracking is disabled".to_string(),
            ));
        }

        let id = AnomalyId::new();
        sqlx::query(
            "INSERT INTO anomalies (id, equipment_id, system, description, detection_date,
                equipment_description, owning_section, ai_reliability, ai_availability,
                ai_process_safety, ai_criticality, method, status, import_batch_id, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(id.to_string())
        .bind(&input.equipment_id)
        .bind(&input.system)
        .bind(&input.description)
        .bind(input.detection_date.as_deref())
        .bind(input.equipment_description.as_deref())
        .bind(input.owning_section.as_deref())
        .bind(i64::from(prediction.reliability().value()))
        .bind(i64::from(prediction.availability().value()))
        .bind(i64::from(prediction.process_safety().value()))
        .bind(i64::from(prediction.criticality()))
        .bind(prediction.method().as_str())
        .bind(StoredAnomaly::INITIAL_STATUS)
        .bind(batch_id.map(|b| b.to_string()))
        .bind(timestamp(Utc::now()))
        .execute(&self.pool)
        .await?;

        debug!("Inserted anomaly with ID {}", id);
        Ok(id)
    }

    async fn update_batch(
        &self,
        batch_id: &BatchId,
        processed_records: usize,
        status: BatchStatus,
        error_message: Option<&str>,
    ) -> StorageResult<()> {
        let current = self.get_batch(batch_id).await?.status;
        if !current.can_transition_to(status) {
            return Err(StorageError::ConstraintViolation(format!(
                "batch {} cannot move from {} to {}",
                batch_id,
                current.as_str(),
                status.as_str()
            )));
        }

        let completed_at = status.is_terminal().then(|| timestamp(Utc::now()));
        let result = sqlx::query(
            "UPDATE import_batches
             SET processed_records = ?, status = ?, error_message = ?, completed_at = ?
             WHERE id = ? AND status = ?",
        )
        .bind(count_to_i64(processed_records))
        .bind(status.as_str())
        .bind(error_message)
        .bind(completed_at)
        .bind(batch_id.to_string())
        .bind(current.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::ConstraintViolation(format!(
                "batch {} changed concurrently",
                batch_id
            )));
        }
        Ok(())
    }

    async fn get_batch(&self, batch_id: &BatchId) -> StorageResult<ImportBatch> {
        let row = sqlx::query(
            "SELECT id, filename, total_records, processed_records, status, error_message,
                created_at, completed_at
             FROM import_batches WHERE id = ?",
        )
        .bind(batch_id.to_string())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StorageError::NotFound(format!("import batch {}", batch_id)))?;

        batch_from_row(&row)
    }

    async fn get_anomaly(&self, id: &AnomalyId) -> StorageResult<StoredAnomaly> {
        let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_ANOMALY))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StorageError::NotFound(format!("anomaly {}", id)))?;

        anomaly_from_row(&row)
    }

    async fn list_anomalies(&self, limit: usize, offset: usize) -> StorageResult<Vec<StoredAnomaly>> {
        let rows = sqlx::query(&format!(
            "{} ORDER BY rowid DESC LIMIT ? OFFSET ?",
            SELECT_ANOMALY
        ))
        .bind(count_to_i64(limit))
        .bind(count_to_i64(offset))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(anomaly_from_row).collect()
    }

    async fn set_human_scores(
        &self,
        id: &AnomalyId,
        scores: HumanScores,
    ) -> StorageResult<StoredAnomaly> {
        let result = sqlx::query(
            "UPDATE anomalies
             SET human_reliability = ?, human_availability = ?, human_process_safety = ?
             WHERE id = ?",
        )
        .bind(scores.reliability.map(|s| i64::from(s.value())))
        .bind(scores.availability.map(|s| i64::from(s.value())))
        .bind(scores.process_safety.map(|s| i64::from(s.value())))
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound(format!("anomaly {}", id)));
        }
        self.get_anomaly(id).await
    }
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn count_to_i64(count: usize) -> i64 {
    i64::try_from(count).unwrap_or(i64::MAX)
}

fn parse_timestamp(value: &str) -> StorageResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| StorageError::SerializationError(format!("timestamp '{}': {}", value, e)))
}

fn parse_count(value: i64, column: &str) -> StorageResult<usize> {
    usize::try_from(value)
        .map_err(|_| StorageError::SerializationError(format!("{} = {}", column, value)))
}

fn parse_score(value: i64, column: &str) -> StorageResult<Score> {
    u8::try_from(value)
        .ok()
        .and_then(|v| Score::new(v).ok())
        .ok_or_else(|| StorageError::SerializationError(format!("{} = {}", column, value)))
}

fn parse_optional_score(value: Option<i64>, column: &str) -> StorageResult<Option<Score>> {
    value.map(|v| parse_score(v, column)).transpose()
}

fn parse_method(value: &str) -> StorageResult<Method> {
    match value {
        "statistical" => Ok(Method::Statistical),
        "rule-based" => Ok(Method::RuleBased),
        other => Err(StorageError::SerializationError(format!(
            "unknown method '{}'",
            other
        ))),
    }
}

fn batch_from_row(row: &SqliteRow) -> StorageResult<ImportBatch> {
    Ok(ImportBatch {
        id: row.try_get::<String, _>("id")?.parse()?,
        filename: row.try_get("filename")?,
        total_records: parse_count(row.try_get("total_records")?, "total_records")?,
        processed_records: parse_count(row.try_get("processed_records")?, "processed_records")?,
        status: row.try_get::<String, _>("status")?.parse()?,
        error_message: row.try_get("error_message")?,
        created_at: parse_timestamp(&row.try_get::<String, _>("created_at")?)?,
        completed_at: row
            .try_get::<Option<String>, _>("completed_at")?
            .as_deref()
            .map(parse_timestamp)
            .transpose()?,
    })
}

fn anomaly_from_row(row: &SqliteRow) -> StorageResult<StoredAnomaly> {
    let ai = ScoreTriple::new(
        parse_score(row.try_get("ai_reliability")?, "ai_reliability")?,
        parse_score(row.try_get("ai_availability")?, "ai_availability")?,
        parse_score(row.try_get("ai_process_safety")?, "ai_process_safety")?,
    );
    let ai_criticality: i64 = row.try_get("ai_criticality")?;

    Ok(StoredAnomaly {
        id: row.try_get::<String, _>("id")?.parse()?,
        input: AnomalyInput {
            equipment_id: row.try_get("equipment_id")?,
            system: row.try_get("system")?,
            description: row.try_get("description")?,
            detection_date: row.try_get("detection_date")?,
            equipment_description: row.try_get("equipment_description")?,
            owning_section: row.try_get("owning_section")?,
        },
        ai,
        ai_criticality: u8::try_from(ai_criticality).map_err(|_| {
            StorageError::SerializationError(format!("ai_criticality = {}", ai_criticality))
        })?,
        method: parse_method(&row.try_get::<String, _>("method")?)?,
        human: HumanScores {
            reliability: parse_optional_score(row.try_get("human_reliability")?, "human_reliability")?,
            availability: parse_optional_score(
                row.try_get("human_availability")?,
                "human_availability",
            )?,
            process_safety: parse_optional_score(
                row.try_get("human_process_safety")?,
                "human_process_safety",
            )?,
        },
        status: row.try_get("status")?,
        import_batch_id: row
            .try_get::<Option<String>, _>("import_batch_id")?
            .map(|id| id.parse())
            .transpose()?,
        created_at: parse_timestamp(&row.try_get::<String, _>("created_at")?)?,
    })
}
