//! PostgreSQL quota ledger and usage repository

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::postgres::{PgPool, PgRow};
use sqlx::{Postgres, QueryBuilder, Row};

use crate::domain::usage::{
    day_of, month_of, QuotaLedger, SessionCounters, UsageOperation, UsageQuery, UsageRecord,
    UsageRecordId, UsageRepository,
};
use crate::domain::DomainError;

const CREATE_COUNTERS_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS ats_quota_counters (
        session_id VARCHAR(255) PRIMARY KEY,
        day DATE NOT NULL,
        month DATE NOT NULL,
        daily_tokens_used BIGINT NOT NULL DEFAULT 0,
        monthly_spent_micros BIGINT NOT NULL DEFAULT 0,
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
"#;

const CREATE_RECORDS_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS ats_usage_records (
        id VARCHAR(255) PRIMARY KEY,
        session_id VARCHAR(255) NOT NULL,
        operation VARCHAR(64) NOT NULL,
        model VARCHAR(255) NOT NULL,
        tokens_used BIGINT NOT NULL,
        input_chars BIGINT NOT NULL,
        output_chars BIGINT NOT NULL,
        response_time_ms BIGINT NOT NULL,
        estimated_cost_micros BIGINT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL
    )
"#;

const CREATE_RECORDS_INDEX: &str = r#"
    CREATE INDEX IF NOT EXISTS idx_ats_usage_records_session_time
        ON ats_usage_records (session_id, created_at)
"#;

/// Create the quota and usage tables if they do not exist
pub async fn ensure_usage_schema(pool: &PgPool) -> Result<(), DomainError> {
    for statement in [CREATE_COUNTERS_TABLE, CREATE_RECORDS_TABLE, CREATE_RECORDS_INDEX] {
        sqlx::query(statement)
            .execute(pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to create usage schema: {}", e)))?;
    }

    Ok(())
}

/// Quota ledger backed by a single upserted row per session.
///
/// Window rollover and the increment happen in one `INSERT ... ON CONFLICT`
/// statement, so concurrent increments are serialized by the row lock.
#[derive(Debug, Clone)]
pub struct PostgresQuotaLedger {
    pool: PgPool,
}

impl PostgresQuotaLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl QuotaLedger for PostgresQuotaLedger {
    async fn snapshot(
        &self,
        session_id: &str,
        now: DateTime<Utc>,
    ) -> Result<SessionCounters, DomainError> {
        let row = sqlx::query(
            r#"
            SELECT session_id, day, month, daily_tokens_used, monthly_spent_micros
            FROM ats_quota_counters
            WHERE session_id = $1
            "#,
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to read quota counters: {}", e)))?;

        match row {
            Some(row) => Ok(row_to_counters(&row)?.current(now)),
            None => Ok(SessionCounters::empty(session_id, now)),
        }
    }

    async fn increment(
        &self,
        session_id: &str,
        tokens: u64,
        cost_micros: i64,
        now: DateTime<Utc>,
    ) -> Result<SessionCounters, DomainError> {
        let row = sqlx::query(
            r#"
            INSERT INTO ats_quota_counters
                (session_id, day, month, daily_tokens_used, monthly_spent_micros, updated_at)
            VALUES ($1, $2, $3, $4, $5, NOW())
            ON CONFLICT (session_id) DO UPDATE SET
                daily_tokens_used = CASE
                    WHEN ats_quota_counters.day = EXCLUDED.day
                    THEN ats_quota_counters.daily_tokens_used + EXCLUDED.daily_tokens_used
                    ELSE EXCLUDED.daily_tokens_used
                END,
                monthly_spent_micros = CASE
                    WHEN ats_quota_counters.month = EXCLUDED.month
                    THEN ats_quota_counters.monthly_spent_micros + EXCLUDED.monthly_spent_micros
                    ELSE EXCLUDED.monthly_spent_micros
                END,
                day = EXCLUDED.day,
                month = EXCLUDED.month,
                updated_at = NOW()
            RETURNING session_id, day, month, daily_tokens_used, monthly_spent_micros
            "#,
        )
        .bind(session_id)
        .bind(day_of(now))
        .bind(month_of(now))
        .bind(to_bigint(tokens))
        .bind(cost_micros.max(0))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to increment quota counters: {}", e)))?;

        row_to_counters(&row)
    }
}

/// Append-only usage log in `ats_usage_records`
#[derive(Debug, Clone)]
pub struct PostgresUsageRepository {
    pool: PgPool,
}

impl PostgresUsageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UsageRepository for PostgresUsageRepository {
    async fn append(&self, record: UsageRecord) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO ats_usage_records
                (id, session_id, operation, model, tokens_used, input_chars, output_chars,
                 response_time_ms, estimated_cost_micros, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(record.id().as_str())
        .bind(&record.session_id)
        .bind(record.operation.as_str())
        .bind(&record.model)
        .bind(to_bigint(record.tokens_used))
        .bind(to_bigint(record.input_chars))
        .bind(to_bigint(record.output_chars))
        .bind(to_bigint(record.response_time_ms))
        .bind(record.estimated_cost_micros)
        .bind(record.timestamp)
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to append usage record: {}", e)))?;

        Ok(())
    }

    async fn query(&self, query: &UsageQuery) -> Result<Vec<UsageRecord>, DomainError> {
        let mut builder = QueryBuilder::<Postgres>::new(
            "SELECT id, session_id, operation, model, tokens_used, input_chars, output_chars, \
             response_time_ms, estimated_cost_micros, created_at FROM ats_usage_records",
        );
        push_filters(&mut builder, query);
        builder.push(" ORDER BY created_at ASC, id ASC");

        if let Some(limit) = query.limit {
            builder.push(" LIMIT ").push_bind(to_bigint(limit as u64));
        }

        let rows = builder
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to query usage records: {}", e)))?;

        rows.iter().map(row_to_record).collect()
    }

    async fn count(&self, query: &UsageQuery) -> Result<usize, DomainError> {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM ats_usage_records");
        push_filters(&mut builder, query);

        let count: i64 = builder
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to count usage records: {}", e)))?;

        Ok(count.max(0) as usize)
    }
}

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, query: &UsageQuery) {
    builder.push(" WHERE TRUE");

    if let Some(ref session_id) = query.session_id {
        builder.push(" AND session_id = ").push_bind(session_id.clone());
    }

    if let Some(operation) = query.operation {
        builder.push(" AND operation = ").push_bind(operation.as_str());
    }

    if let Some(from) = query.from {
        builder.push(" AND created_at >= ").push_bind(from);
    }

    if let Some(to) = query.to {
        builder.push(" AND created_at < ").push_bind(to);
    }
}

fn row_to_counters(row: &PgRow) -> Result<SessionCounters, DomainError> {
    let map_err = |e: sqlx::Error| DomainError::storage(format!("Invalid quota row: {}", e));

    Ok(SessionCounters {
        session_id: row.try_get("session_id").map_err(map_err)?,
        day: row.try_get::<NaiveDate, _>("day").map_err(map_err)?,
        month: row.try_get::<NaiveDate, _>("month").map_err(map_err)?,
        daily_tokens_used: from_bigint(row.try_get("daily_tokens_used").map_err(map_err)?),
        monthly_spent_micros: row.try_get("monthly_spent_micros").map_err(map_err)?,
    })
}

fn row_to_record(row: &PgRow) -> Result<UsageRecord, DomainError> {
    let map_err = |e: sqlx::Error| DomainError::storage(format!("Invalid usage row: {}", e));

    let id: String = row.try_get("id").map_err(map_err)?;
    let session_id: String = row.try_get("session_id").map_err(map_err)?;
    let operation: String = row.try_get("operation").map_err(map_err)?;
    let model: String = row.try_get("model").map_err(map_err)?;
    let timestamp: DateTime<Utc> = row.try_get("created_at").map_err(map_err)?;

    let operation: UsageOperation = operation.parse().map_err(DomainError::storage)?;

    Ok(UsageRecord::new(session_id, operation, model, timestamp)
        .with_id(UsageRecordId::new(id))
        .with_tokens(from_bigint(row.try_get("tokens_used").map_err(map_err)?))
        .with_text_sizes(
            from_bigint(row.try_get("input_chars").map_err(map_err)?),
            from_bigint(row.try_get("output_chars").map_err(map_err)?),
        )
        .with_response_time_ms(from_bigint(row.try_get("response_time_ms").map_err(map_err)?))
        .with_cost_micros(row.try_get("estimated_cost_micros").map_err(map_err)?))
}

fn to_bigint(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn from_bigint(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}
