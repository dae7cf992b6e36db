use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use sentinel_common::{
    AdhocAnalysis, AnalysisStatus, Crisis, CrisisVerdict, NewCrisis, NewNotification,
    NewTimelineItem, Notification, SourceRef, TimelineItem, Verdict, VerificationStatus,
    INITIAL_VERDICT_SUMMARY,
};

use crate::error::{Result, StoreError};
use crate::traits::CandidateStore;

/// Postgres-backed candidate store.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

#[derive(sqlx::FromRow)]
struct CrisisRow {
    id: Uuid,
    name: String,
    description: String,
    keywords: String,
    severity: i32,
    location: String,
    verdict_status: String,
    verdict_summary: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct TimelineRow {
    id: Uuid,
    crisis_id: Option<Uuid>,
    claim_text: String,
    status: String,
    summary: String,
    location: Option<String>,
    sources: Json<Vec<SourceRef>>,
    recorded_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct AdhocRow {
    id: Uuid,
    query_text: String,
    status: String,
    verdict_status: Option<String>,
    verdict_summary: Option<String>,
    verdict_sources: Option<Json<Vec<SourceRef>>>,
    created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct NotificationRow {
    id: Uuid,
    content: String,
    notification_type: String,
    crisis_id: Option<Uuid>,
    created_at: DateTime<Utc>,
}

fn decode_err(message: String) -> StoreError {
    StoreError::Database(sqlx::Error::Decode(message.into()))
}

impl TryFrom<CrisisRow> for Crisis {
    type Error = StoreError;

    fn try_from(row: CrisisRow) -> Result<Self> {
        Ok(Crisis {
            id: row.id,
            name: row.name,
            description: row.description,
            keywords: row.keywords,
            severity: row.severity,
            location: row.location,
            verdict_status: row.verdict_status.parse().map_err(decode_err)?,
            verdict_summary: row.verdict_summary,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

impl TryFrom<TimelineRow> for TimelineItem {
    type Error = StoreError;

    fn try_from(row: TimelineRow) -> Result<Self> {
        Ok(TimelineItem {
            id: row.id,
            crisis_id: row.crisis_id,
            claim_text: row.claim_text,
            status: row.status.parse().map_err(decode_err)?,
            summary: row.summary,
            location: row.location,
            sources: row.sources.0,
            timestamp: row.recorded_at,
        })
    }
}

impl TryFrom<AdhocRow> for AdhocAnalysis {
    type Error = StoreError;

    fn try_from(row: AdhocRow) -> Result<Self> {
        let verdict_status = row
            .verdict_status
            .map(|s| s.parse::<VerificationStatus>())
            .transpose()
            .map_err(decode_err)?;
        Ok(AdhocAnalysis {
            id: row.id,
            query_text: row.query_text,
            status: row.status.parse().map_err(decode_err)?,
            verdict_status,
            verdict_summary: row.verdict_summary,
            verdict_sources: row.verdict_sources.map(|j| j.0),
            created_at: row.created_at,
        })
    }
}

impl TryFrom<NotificationRow> for Notification {
    type Error = StoreError;

    fn try_from(row: NotificationRow) -> Result<Self> {
        Ok(Notification {
            id: row.id,
            content: row.content,
            notification_type: row.notification_type.parse().map_err(decode_err)?,
            crisis_id: row.crisis_id,
            created_at: row.created_at,
        })
    }
}

fn collect<R, T>(rows: Vec<R>) -> Result<Vec<T>>
where
    T: TryFrom<R, Error = StoreError>,
{
    rows.into_iter().map(T::try_from).collect()
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect with a small pool and run the embedded migrations.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        let store = Self::new(pool);
        store.migrate().await?;
        Ok(store)
    }

    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Candidate store migrations applied");
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl CandidateStore for PgStore {
    async fn create_crisis(&self, crisis: NewCrisis) -> Result<Crisis> {
        let row = sqlx::query_as::<_, CrisisRow>(
            r#"
            INSERT INTO crises
                (id, name, description, keywords, severity, location,
                 verdict_status, verdict_summary)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&crisis.name)
        .bind(&crisis.description)
        .bind(&crisis.keywords)
        .bind(crisis.severity)
        .bind(&crisis.location)
        .bind(CrisisVerdict::Pending.as_str())
        .bind(INITIAL_VERDICT_SUMMARY)
        .fetch_one(&self.pool)
        .await?;

        row.try_into()
    }

    async fn get_crisis(&self, id: Uuid) -> Result<Option<Crisis>> {
        sqlx::query_as::<_, CrisisRow>("SELECT * FROM crises WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Crisis::try_from)
            .transpose()
    }

    async fn list_crises(&self, limit: usize) -> Result<Vec<Crisis>> {
        let rows = sqlx::query_as::<_, CrisisRow>(
            r#"
            SELECT * FROM crises
            ORDER BY severity DESC, created_at DESC
            LIMIT $1
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        collect(rows)
    }

    async fn find_crisis_by_fuzzy_name(&self, name: &str) -> Result<Option<Crisis>> {
        let name = name.trim();
        if name.is_empty() {
            return Ok(None);
        }
        sqlx::query_as::<_, CrisisRow>(
            r#"
            SELECT * FROM crises
            WHERE strpos(lower(name), lower($1)) > 0
               OR strpos(lower($1), lower(name)) > 0
            ORDER BY created_at
            LIMIT 1
            "#,
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?
        .map(Crisis::try_from)
        .transpose()
    }

    async fn update_crisis_verdict(
        &self,
        id: Uuid,
        verdict: CrisisVerdict,
        summary: &str,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE crises
            SET verdict_status = $2, verdict_summary = $3, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(verdict.as_str())
        .bind(summary)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_crisis(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM crises WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_crises_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM crises WHERE created_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn create_timeline_item(&self, item: NewTimelineItem) -> Result<TimelineItem> {
        let inserted = sqlx::query_as::<_, TimelineRow>(
            r#"
            INSERT INTO timeline_items
                (id, crisis_id, claim_text, status, summary, location, sources)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (claim_text) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(item.crisis_id)
        .bind(&item.claim_text)
        .bind(item.status.as_str())
        .bind(&item.summary)
        .bind(&item.location)
        .bind(Json(&item.sources))
        .fetch_optional(&self.pool)
        .await?;

        match inserted {
            Some(row) => row.try_into(),
            None => self
                .get_timeline_item_by_claim(&item.claim_text)
                .await?
                .ok_or_else(|| StoreError::NotFound(format!("timeline item '{}'", item.claim_text))),
        }
    }

    async fn get_timeline_item(&self, id: Uuid) -> Result<Option<TimelineItem>> {
        sqlx::query_as::<_, TimelineRow>("SELECT * FROM timeline_items WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(TimelineItem::try_from)
            .transpose()
    }

    async fn get_timeline_item_by_claim(&self, claim_text: &str) -> Result<Option<TimelineItem>> {
        sqlx::query_as::<_, TimelineRow>("SELECT * FROM timeline_items WHERE claim_text = $1")
            .bind(claim_text)
            .fetch_optional(&self.pool)
            .await?
            .map(TimelineItem::try_from)
            .transpose()
    }

    async fn timeline_items_for_crisis(&self, crisis_id: Uuid) -> Result<Vec<TimelineItem>> {
        let rows = sqlx::query_as::<_, TimelineRow>(
            r#"
            SELECT * FROM timeline_items
            WHERE crisis_id = $1
            ORDER BY recorded_at DESC
            "#,
        )
        .bind(crisis_id)
        .fetch_all(&self.pool)
        .await?;

        collect(rows)
    }

    async fn update_timeline_item(&self, id: Uuid, verdict: &Verdict) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE timeline_items
            SET status = $2, summary = $3, sources = $4, recorded_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(verdict.status.as_str())
        .bind(&verdict.summary)
        .bind(Json(&verdict.sources))
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn unconfirmed_timeline_items(&self, limit: usize) -> Result<Vec<TimelineItem>> {
        let rows = sqlx::query_as::<_, TimelineRow>(
            r#"
            SELECT * FROM timeline_items
            WHERE status = $1
            ORDER BY recorded_at ASC
            LIMIT $2
            "#,
        )
        .bind(VerificationStatus::Unconfirmed.as_str())
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        collect(rows)
    }

    async fn delete_stale_unconfirmed(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let result =
            sqlx::query("DELETE FROM timeline_items WHERE status = $1 AND recorded_at < $2")
                .bind(VerificationStatus::Unconfirmed.as_str())
                .bind(cutoff)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected())
    }

    async fn create_adhoc_analysis(&self, query_text: &str) -> Result<AdhocAnalysis> {
        let row = sqlx::query_as::<_, AdhocRow>(
            r#"
            INSERT INTO adhoc_analyses (id, query_text, status)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(query_text)
        .bind(AnalysisStatus::Pending.as_str())
        .fetch_one(&self.pool)
        .await?;

        row.try_into()
    }

    async fn get_adhoc_analysis(&self, id: Uuid) -> Result<Option<AdhocAnalysis>> {
        sqlx::query_as::<_, AdhocRow>("SELECT * FROM adhoc_analyses WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(AdhocAnalysis::try_from)
            .transpose()
    }

    async fn update_adhoc_analysis(
        &self,
        id: Uuid,
        status: AnalysisStatus,
        verdict: Option<&Verdict>,
    ) -> Result<bool> {
        let result = match verdict {
            Some(v) => {
                sqlx::query(
                    r#"
                    UPDATE adhoc_analyses
                    SET status = $2, verdict_status = $3, verdict_summary = $4,
                        verdict_sources = $5
                    WHERE id = $1
                    "#,
                )
                .bind(id)
                .bind(status.as_str())
                .bind(v.status.as_str())
                .bind(&v.summary)
                .bind(Json(&v.sources))
                .execute(&self.pool)
                .await?
            }
            None => {
                sqlx::query("UPDATE adhoc_analyses SET status = $2 WHERE id = $1")
                    .bind(id)
                    .bind(status.as_str())
                    .execute(&self.pool)
                    .await?
            }
        };
        Ok(result.rows_affected() > 0)
    }

    async fn delete_adhoc_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM adhoc_analyses WHERE created_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn create_notification(&self, notification: NewNotification) -> Result<Notification> {
        let row = sqlx::query_as::<_, NotificationRow>(
            r#"
            INSERT INTO notifications (id, content, notification_type, crisis_id)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&notification.content)
        .bind(notification.notification_type.as_str())
        .bind(notification.crisis_id)
        .fetch_one(&self.pool)
        .await?;

        row.try_into()
    }

    async fn latest_notification(&self) -> Result<Option<Notification>> {
        sqlx::query_as::<_, NotificationRow>(
            "SELECT * FROM notifications ORDER BY created_at DESC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?
        .map(Notification::try_from)
        .transpose()
    }
}
