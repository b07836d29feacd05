//! The suspension store: parameterized queries over the `suspensions` table.

use crate::record::{Suspension, SuspensionRow};
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;
use warden_core::{
    ActorId, Result, ScopeId, SubjectId, SuspensionId, WardenError, MAX_SUSPENSION,
};

const SELECT_COLUMNS: &str =
    "id, scope_id, subject_id, issuer_id, expires_at, reason, is_active, created_at, lifted_at";

fn store_err(err: sqlx::Error) -> WardenError {
    WardenError::storage(err.to_string())
}

/// Durable store of suspension records.
///
/// Cloning is cheap; all clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct SuspensionStore {
    pool: SqlitePool,
}

impl SuspensionStore {
    /// Wrap an existing connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (creating if missing) a database at `url` and wrap it.
    pub async fn connect(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(store_err)?
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .connect_with(options)
            .await
            .map_err(store_err)?;
        Ok(Self { pool })
    }

    /// Access the underlying pool (collaborating schemas live elsewhere).
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Apply the suspension schema. Idempotent.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS suspensions (
                id         INTEGER PRIMARY KEY AUTOINCREMENT,
                scope_id   INTEGER NOT NULL,
                subject_id INTEGER NOT NULL,
                issuer_id  INTEGER NOT NULL,
                expires_at INTEGER NOT NULL,
                reason     TEXT NOT NULL,
                is_active  INTEGER NOT NULL DEFAULT 1,
                created_at INTEGER NOT NULL,
                lifted_at  INTEGER
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(store_err)?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_suspensions_active
             ON suspensions (scope_id, subject_id, is_active)",
        )
        .execute(&self.pool)
        .await
        .map_err(store_err)?;

        Ok(())
    }

    /// Persist a new active suspension.
    ///
    /// The requested duration is clamped to the platform ceiling before the
    /// absolute expiry is computed; what lands in the store is always
    /// enforceable. Zero durations are rejected so expiry is strictly after
    /// creation.
    pub async fn create(
        &self,
        scope: ScopeId,
        subject: SubjectId,
        issuer: ActorId,
        duration: Duration,
        reason: impl Into<String>,
    ) -> Result<Suspension> {
        if duration.is_zero() {
            return Err(WardenError::invalid("suspension duration must be non-zero"));
        }
        let capped = duration.min(MAX_SUSPENSION);
        let span = chrono::Duration::from_std(capped)
            .map_err(|err| WardenError::invalid(format!("duration out of range: {err}")))?;

        let now = Utc::now();
        let expires_at = now + span;
        let reason = reason.into();

        let inserted = sqlx::query(
            "INSERT INTO suspensions
                 (scope_id, subject_id, issuer_id, expires_at, reason, is_active, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6)",
        )
        .bind(scope.raw())
        .bind(subject.raw())
        .bind(issuer.raw())
        .bind(expires_at.timestamp_millis())
        .bind(&reason)
        .bind(now.timestamp_millis())
        .execute(&self.pool)
        .await
        .map_err(store_err)?;

        let id = SuspensionId::new(inserted.last_insert_rowid());
        debug!(%id, %scope, %subject, "suspension row inserted");

        self.get(id)
            .await?
            .ok_or_else(|| WardenError::internal(format!("freshly inserted {id} missing")))
    }

    /// Fetch a record by id.
    pub async fn get(&self, id: SuspensionId) -> Result<Option<Suspension>> {
        let row = sqlx::query_as::<_, SuspensionRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM suspensions WHERE id = ?1"
        ))
        .bind(id.raw())
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)?;

        row.map(SuspensionRow::decode).transpose()
    }

    /// Flip a record to inactive and stamp its lift time, if and only if it
    /// is still active.
    ///
    /// This is the race arbiter for the whole subsystem: the conditional
    /// `is_active = 1` predicate means exactly one concurrent caller gets
    /// the record back; everyone else gets `None` and must perform no
    /// further side effects. Terminal: a deactivated row never reactivates.
    pub async fn deactivate(&self, id: SuspensionId) -> Result<Option<Suspension>> {
        let now = Utc::now().timestamp_millis();
        let updated = sqlx::query(
            "UPDATE suspensions SET is_active = 0, lifted_at = ?1
             WHERE id = ?2 AND is_active = 1",
        )
        .bind(now)
        .bind(id.raw())
        .execute(&self.pool)
        .await
        .map_err(store_err)?;

        if updated.rows_affected() == 0 {
            return Ok(None);
        }

        let record = self
            .get(id)
            .await?
            .ok_or_else(|| WardenError::internal(format!("deactivated {id} missing")))?;
        Ok(Some(record))
    }

    /// Most-recently-created active record for a subject in a scope.
    ///
    /// Defensive against multiple active rows for the same pair: newest
    /// wins.
    pub async fn find_active_by_subject(
        &self,
        scope: ScopeId,
        subject: SubjectId,
    ) -> Result<Option<Suspension>> {
        let row = sqlx::query_as::<_, SuspensionRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM suspensions
             WHERE scope_id = ?1 AND subject_id = ?2 AND is_active = 1
             ORDER BY created_at DESC, id DESC LIMIT 1"
        ))
        .bind(scope.raw())
        .bind(subject.raw())
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)?;

        row.map(SuspensionRow::decode).transpose()
    }

    /// Active records whose expiry is at or before `now` (recovery catch-up).
    pub async fn list_active_expired(&self, now: DateTime<Utc>) -> Result<Vec<Suspension>> {
        self.list_where(
            &format!(
                "SELECT {SELECT_COLUMNS} FROM suspensions
                 WHERE is_active = 1 AND expires_at <= ?1"
            ),
            now.timestamp_millis(),
        )
        .await
    }

    /// Active records whose expiry is after `now` (recovery rescheduling).
    pub async fn list_active_unexpired(&self, now: DateTime<Utc>) -> Result<Vec<Suspension>> {
        self.list_where(
            &format!(
                "SELECT {SELECT_COLUMNS} FROM suspensions
                 WHERE is_active = 1 AND expires_at > ?1"
            ),
            now.timestamp_millis(),
        )
        .await
    }

    /// Active records in a scope, soonest expiry first.
    pub async fn list_active(&self, scope: ScopeId) -> Result<Vec<Suspension>> {
        self.list_where(
            &format!(
                "SELECT {SELECT_COLUMNS} FROM suspensions
                 WHERE scope_id = ?1 AND is_active = 1
                 ORDER BY expires_at ASC"
            ),
            scope.raw(),
        )
        .await
    }

    async fn list_where(&self, sql: &str, bind: i64) -> Result<Vec<Suspension>> {
        let rows = sqlx::query_as::<_, SuspensionRow>(sql)
            .bind(bind)
            .fetch_all(&self.pool)
            .await
            .map_err(store_err)?;

        rows.into_iter().map(SuspensionRow::decode).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn memory_store() -> SuspensionStore {
        // Single connection so every query sees the same in-memory database
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let store = SuspensionStore::new(pool);
        store.migrate().await.unwrap();
        store
    }

    #[tokio::test]
    async fn create_persists_and_returns_record() {
        let store = memory_store().await;
        let record = store
            .create(
                ScopeId::new(1),
                SubjectId::new(2),
                ActorId::new(3),
                Duration::from_secs(600),
                "spam",
            )
            .await
            .unwrap();

        assert!(record.is_active);
        assert_eq!(record.reason, "spam");
        assert!(record.expires_at > record.created_at);
        assert!(record.lifted_at.is_none());

        let fetched = store.get(record.id).await.unwrap().unwrap();
        assert_eq!(fetched, record);
    }

    #[tokio::test]
    async fn create_clamps_to_platform_ceiling() {
        let store = memory_store().await;
        let forty_days = Duration::from_secs(40 * 24 * 60 * 60);
        let record = store
            .create(
                ScopeId::new(1),
                SubjectId::new(2),
                ActorId::new(3),
                forty_days,
                "long ban attempt",
            )
            .await
            .unwrap();

        let lifetime = record.expires_at - record.created_at;
        let ceiling = chrono::Duration::from_std(MAX_SUSPENSION).unwrap();
        assert!(lifetime <= ceiling + chrono::Duration::seconds(1));
    }

    #[tokio::test]
    async fn create_rejects_zero_duration() {
        let store = memory_store().await;
        let err = store
            .create(
                ScopeId::new(1),
                SubjectId::new(2),
                ActorId::new(3),
                Duration::ZERO,
                "instant",
            )
            .await
            .unwrap_err();
        assert!(matches!(err, WardenError::Invalid { .. }));
    }

    #[tokio::test]
    async fn deactivate_is_terminal_and_idempotent() {
        let store = memory_store().await;
        let record = store
            .create(
                ScopeId::new(1),
                SubjectId::new(2),
                ActorId::new(3),
                Duration::from_secs(60),
                "flood",
            )
            .await
            .unwrap();

        let first = store.deactivate(record.id).await.unwrap().unwrap();
        assert!(!first.is_active);
        assert!(first.lifted_at.is_some());

        // Second call loses the CAS and must be a silent no-op
        assert!(store.deactivate(record.id).await.unwrap().is_none());

        let fetched = store.get(record.id).await.unwrap().unwrap();
        assert!(!fetched.is_active);
    }

    #[tokio::test]
    async fn find_active_by_subject_prefers_newest() {
        let store = memory_store().await;
        let scope = ScopeId::new(10);
        let subject = SubjectId::new(20);
        let issuer = ActorId::new(30);

        let older = store
            .create(scope, subject, issuer, Duration::from_secs(60), "first")
            .await
            .unwrap();
        let newer = store
            .create(scope, subject, issuer, Duration::from_secs(120), "second")
            .await
            .unwrap();

        let found = store
            .find_active_by_subject(scope, subject)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, newer.id);

        // After the newest is lifted the older active row surfaces
        store.deactivate(newer.id).await.unwrap();
        let found = store
            .find_active_by_subject(scope, subject)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, older.id);

        store.deactivate(older.id).await.unwrap();
        assert!(store
            .find_active_by_subject(scope, subject)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn expiry_partitions_split_on_now() {
        let store = memory_store().await;
        let scope = ScopeId::new(1);
        let live = store
            .create(
                scope,
                SubjectId::new(2),
                ActorId::new(3),
                Duration::from_secs(3600),
                "an hour",
            )
            .await
            .unwrap();

        // Backdate a second record so it reads as overdue
        sqlx::query(
            "INSERT INTO suspensions
                 (scope_id, subject_id, issuer_id, expires_at, reason, is_active, created_at)
             VALUES (?1, ?2, ?3, ?4, 'overdue', 1, ?5)",
        )
        .bind(scope.raw())
        .bind(4_i64)
        .bind(3_i64)
        .bind(Utc::now().timestamp_millis() - 5_000)
        .bind(Utc::now().timestamp_millis() - 60_000)
        .execute(store.pool())
        .await
        .unwrap();

        let now = Utc::now();
        let overdue = store.list_active_expired(now).await.unwrap();
        assert_eq!(overdue.len(), 1);
        assert_eq!(overdue[0].reason, "overdue");

        let pending = store.list_active_unexpired(now).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, live.id);
    }

    #[tokio::test]
    async fn records_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("warden.db").display());

        let store = SuspensionStore::connect(&url).await.unwrap();
        store.migrate().await.unwrap();
        let record = store
            .create(
                ScopeId::new(1),
                SubjectId::new(2),
                ActorId::new(3),
                Duration::from_secs(3600),
                "durable",
            )
            .await
            .unwrap();
        drop(store);

        let reopened = SuspensionStore::connect(&url).await.unwrap();
        reopened.migrate().await.unwrap();
        let fetched = reopened.get(record.id).await.unwrap().unwrap();
        assert_eq!(fetched, record);
    }

    #[tokio::test]
    async fn list_active_is_scoped_and_ordered() {
        let store = memory_store().await;
        let scope = ScopeId::new(7);
        let other_scope = ScopeId::new(8);
        let issuer = ActorId::new(1);

        let late = store
            .create(
                scope,
                SubjectId::new(100),
                issuer,
                Duration::from_secs(7200),
                "late",
            )
            .await
            .unwrap();
        let soon = store
            .create(
                scope,
                SubjectId::new(101),
                issuer,
                Duration::from_secs(60),
                "soon",
            )
            .await
            .unwrap();
        store
            .create(
                other_scope,
                SubjectId::new(102),
                issuer,
                Duration::from_secs(60),
                "elsewhere",
            )
            .await
            .unwrap();

        let listed = store.list_active(scope).await.unwrap();
        assert_eq!(
            listed.iter().map(|r| r.id).collect::<Vec<_>>(),
            vec![soon.id, late.id]
        );
    }
}
