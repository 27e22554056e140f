//! SQLite-backed [`Store`] implementation.
//!
//! Grounded on the teacher crate's PostgreSQL job store: the same
//! transactional retry/backoff/dead-letter shape, adapted from a single
//! `jobs` table to the core's queue/task/event schema and from
//! `FOR UPDATE SKIP LOCKED` claims to SQLite's serialized-writer model
//! (`BEGIN IMMEDIATE` for compound read-then-write operations).
//!
//! # Schema
//!
//! ```sql
//! CREATE TABLE queue (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT UNIQUE NOT NULL);
//!
//! CREATE TABLE task (
//!     id INTEGER PRIMARY KEY AUTOINCREMENT,
//!     queue_id INTEGER NOT NULL REFERENCES queue(id),
//!     queued_at TEXT NOT NULL,
//!     priority INTEGER NOT NULL DEFAULT 0,
//!     status TEXT NOT NULL DEFAULT 'Q',
//!     retry_at TEXT NOT NULL,
//!     retry_count INTEGER NOT NULL DEFAULT 0,
//!     failure_reason TEXT,
//!     exception BLOB,
//!     payload BLOB NOT NULL
//! );
//! CREATE INDEX idx_task_ready ON task (queue_id, status, retry_at, priority);
//!
//! CREATE TABLE event (
//!     id INTEGER PRIMARY KEY AUTOINCREMENT,
//!     task_id INTEGER REFERENCES task(id),
//!     event BLOB NOT NULL,
//!     event_at TEXT NOT NULL
//! );
//! CREATE INDEX idx_event_task ON event (task_id, id);
//! CREATE INDEX idx_event_at ON event (event_at, id);
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use sqlx::{sqlite::SqlitePoolOptions, Row, SqlitePool};
use std::time::Duration;
use taskqueue_core::clock::{system_clock, SharedClock};
use taskqueue_core::model::{EventId, QueueId, ScheduledTask, TaskId, TaskKind, TaskRecord, TaskStatus};
use taskqueue_core::store::{EventView, Store, TaskView};
use tracing::{debug, instrument};

/// A `Store` backed by a `sqlx::SqlitePool`.
///
/// Cheap to clone: internally just an `Arc`-backed pool handle, matching the
/// teacher crate's `PgJobStore`.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
    clock: SharedClock,
}

impl SqliteStore {
    /// Wrap an already-connected pool. Does not run migrations; call
    /// [`SqliteStore::migrate`] once at startup.
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            clock: system_clock(),
        }
    }

    /// Like [`SqliteStore::new`], but stamps timestamps from `clock` instead
    /// of the system clock. Used by tests that need deterministic time.
    pub fn with_clock(pool: SqlitePool, clock: SharedClock) -> Self {
        Self { pool, clock }
    }

    /// Connect to `path` (or `sqlite::memory:` for an ephemeral store),
    /// creating the database file if it does not exist yet, and run
    /// migrations.
    pub async fn connect(path: &str) -> anyhow::Result<Self> {
        let options: sqlx::sqlite::SqliteConnectOptions = path.parse::<sqlx::sqlite::SqliteConnectOptions>()?
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new().max_connections(5).connect_with(options).await?;
        let store = Self::new(pool);
        store.migrate().await?;
        Ok(store)
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS queue (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT UNIQUE NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS task (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                queue_id INTEGER NOT NULL REFERENCES queue(id),
                queued_at TEXT NOT NULL,
                priority INTEGER NOT NULL DEFAULT 0,
                status TEXT NOT NULL DEFAULT 'Q',
                retry_at TEXT NOT NULL,
                retry_count INTEGER NOT NULL DEFAULT 0,
                failure_reason TEXT,
                exception BLOB,
                payload BLOB NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_task_ready ON task (queue_id, status, retry_at, priority)")
            .execute(&self.pool)
            .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS event (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                task_id INTEGER REFERENCES task(id),
                event BLOB NOT NULL,
                event_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_event_task ON event (task_id, id)")
            .execute(&self.pool)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_event_at ON event (event_at, id)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    async fn cleanup_orphans_tx(tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>) -> anyhow::Result<()> {
        sqlx::query(
            "DELETE FROM event WHERE task_id IS NOT NULL AND task_id NOT IN (SELECT id FROM task)",
        )
        .execute(&mut **tx)
        .await?;

        sqlx::query(
            r#"
            DELETE FROM task
            WHERE status = 'S'
              AND id NOT IN (SELECT task_id FROM event WHERE task_id IS NOT NULL)
            "#,
        )
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    fn row_to_task(row: &sqlx::sqlite::SqliteRow) -> anyhow::Result<TaskRecord> {
        let status_code: String = row.try_get("status")?;
        let status = TaskStatus::from_code(&status_code)
            .ok_or_else(|| anyhow::anyhow!("unrecognized task status code: {status_code}"))?;
        Ok(TaskRecord {
            id: row.try_get("id")?,
            queue_id: row.try_get("queue_id")?,
            queued_at: row.try_get("queued_at")?,
            priority: row.try_get("priority")?,
            status,
            retry_at: row.try_get("retry_at")?,
            retry_count: row.try_get::<i64, _>("retry_count")? as u32,
            failure_reason: row.try_get("failure_reason")?,
            exception_blob: row.try_get("exception")?,
            payload_blob: row.try_get("payload")?,
        })
    }

    fn row_to_task_view(row: &sqlx::sqlite::SqliteRow) -> anyhow::Result<TaskView> {
        let status_code: String = row.try_get("status")?;
        Ok(TaskView {
            id: row.try_get("id")?,
            queue_id: row.try_get("queue_id")?,
            queued_at: row.try_get("queued_at")?,
            retry_at: row.try_get("retry_at")?,
            retry_count: row.try_get::<i64, _>("retry_count")? as u32,
            status_code: status_code.chars().next().unwrap_or('Q'),
            failure_reason: row.try_get("failure_reason")?,
            exception_blob: row.try_get("exception")?,
            payload_blob: row.try_get("payload")?,
            event_count: row.try_get("event_count")?,
            selected: false,
        })
    }

    fn row_to_event_view(row: &sqlx::sqlite::SqliteRow) -> anyhow::Result<EventView> {
        Ok(EventView {
            id: row.try_get("id")?,
            task_id: row.try_get("task_id")?,
            event_blob: row.try_get("event")?,
            event_at: row.try_get("event_at")?,
        })
    }
}

#[async_trait]
impl Store for SqliteStore {
    #[instrument(skip(self))]
    async fn get_or_create_queue(&self, name: &str) -> anyhow::Result<QueueId> {
        sqlx::query("INSERT INTO queue (name) VALUES (?) ON CONFLICT(name) DO NOTHING")
            .bind(name)
            .execute(&self.pool)
            .await?;

        let id: i64 = sqlx::query_scalar("SELECT id FROM queue WHERE name = ?")
            .bind(name)
            .fetch_one(&self.pool)
            .await?;
        Ok(id)
    }

    #[instrument(skip(self, payload_blob))]
    async fn enqueue(
        &self,
        queue_name: &str,
        priority: i64,
        payload_blob: Vec<u8>,
        creating: bool,
    ) -> anyhow::Result<Option<TaskId>> {
        let queue_id: Option<i64> = sqlx::query_scalar("SELECT id FROM queue WHERE name = ?")
            .bind(queue_name)
            .fetch_optional(&self.pool)
            .await?;

        let queue_id = match queue_id {
            Some(id) => id,
            None if creating => self.get_or_create_queue(queue_name).await?,
            None => return Ok(None),
        };

        let now = self.now();
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO task (queue_id, queued_at, priority, status, retry_at, retry_count, payload)
            VALUES (?, ?, ?, 'Q', ?, 0, ?)
            RETURNING id
            "#,
        )
        .bind(queue_id)
        .bind(now)
        .bind(priority)
        .bind(now)
        .bind(payload_blob)
        .fetch_one(&self.pool)
        .await?;

        debug!(task_id = id, queue = queue_name, "task enqueued");
        Ok(Some(id))
    }

    #[instrument(skip(self))]
    async fn next_task(&self, queue_name: &str) -> anyhow::Result<Option<ScheduledTask>> {
        let queue_id: Option<i64> = sqlx::query_scalar("SELECT id FROM queue WHERE name = ?")
            .bind(queue_name)
            .fetch_optional(&self.pool)
            .await?;
        let Some(queue_id) = queue_id else {
            return Ok(None);
        };

        let now = self.now();

        let eligible = sqlx::query(
            r#"
            SELECT * FROM task
            WHERE queue_id = ? AND status = 'Q' AND retry_at <= ?
            ORDER BY priority ASC, retry_at ASC, id ASC
            LIMIT 1
            "#,
        )
        .bind(queue_id)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = eligible {
            let task = Self::row_to_task(&row)?;
            return Ok(Some(ScheduledTask {
                task,
                wait: Duration::ZERO,
            }));
        }

        let future = sqlx::query(
            r#"
            SELECT * FROM task
            WHERE queue_id = ? AND status = 'Q' AND retry_at > ?
            ORDER BY retry_at ASC, priority ASC, id ASC
            LIMIT 1
            "#,
        )
        .bind(queue_id)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        match future {
            Some(row) => {
                let task = Self::row_to_task(&row)?;
                let wait = taskqueue_core::clock::wait_duration(now, task.retry_at);
                Ok(Some(ScheduledTask { task, wait }))
            }
            None => Ok(None),
        }
    }

    #[instrument(skip(self))]
    async fn mark_success(&self, task_id: TaskId) -> anyhow::Result<()> {
        let event_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM event WHERE task_id = ?")
            .bind(task_id)
            .fetch_one(&self.pool)
            .await?;

        if event_count == 0 {
            sqlx::query("DELETE FROM task WHERE id = ?")
                .bind(task_id)
                .execute(&self.pool)
                .await?;
        } else {
            sqlx::query("UPDATE task SET status = 'S' WHERE id = ?")
                .bind(task_id)
                .execute(&self.pool)
                .await?;
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn mark_requeue(
        &self,
        task_id: TaskId,
        retry_limit: u32,
        retry_delay: Duration,
    ) -> anyhow::Result<()> {
        let mut tx = self.pool.begin().await?;

        let retry_count: Option<i64> = sqlx::query_scalar("SELECT retry_count FROM task WHERE id = ?")
            .bind(task_id)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(retry_count) = retry_count else {
            // Row already gone (concurrent delete); nothing to update.
            tx.commit().await?;
            return Ok(());
        };

        if retry_count as u32 >= retry_limit {
            Self::mark_failure_tx(&mut tx, task_id, "Retry limit exceeded", None).await?;
        } else {
            let retry_at = self.now()
                + ChronoDuration::from_std(retry_delay).unwrap_or_else(|_| ChronoDuration::seconds(3600));
            sqlx::query(
                "UPDATE task SET retry_at = ?, retry_count = retry_count + 1 WHERE id = ?",
            )
            .bind(retry_at)
            .bind(task_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    #[instrument(skip(self, exception_blob))]
    async fn mark_failure(
        &self,
        task_id: TaskId,
        reason: &str,
        exception_blob: Option<Vec<u8>>,
    ) -> anyhow::Result<()> {
        let mut tx = self.pool.begin().await?;
        Self::mark_failure_tx(&mut tx, task_id, reason, exception_blob).await?;
        tx.commit().await?;
        Ok(())
    }

    #[instrument(skip(self, payload_blob))]
    async fn update(&self, task_id: TaskId, payload_blob: Vec<u8>) -> anyhow::Result<()> {
        sqlx::query("UPDATE task SET payload = ? WHERE id = ?")
            .bind(payload_blob)
            .bind(task_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    #[instrument(skip(self, event_blob))]
    async fn store_task_event(
        &self,
        task_id: TaskId,
        event_blob: Vec<u8>,
    ) -> anyhow::Result<Option<EventId>> {
        let mut tx = self.pool.begin().await?;

        let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM task WHERE id = ?")
            .bind(task_id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            tx.commit().await?;
            return Ok(None);
        }

        let now = self.now();
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO event (task_id, event, event_at) VALUES (?, ?, ?) RETURNING id",
        )
        .bind(task_id)
        .bind(event_blob)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(id))
    }

    #[instrument(skip(self, event_blob))]
    async fn store_event(&self, event_blob: Vec<u8>) -> anyhow::Result<EventId> {
        let now = self.now();
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO event (task_id, event, event_at) VALUES (NULL, ?, ?) RETURNING id",
        )
        .bind(event_blob)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }

    #[instrument(skip(self))]
    async fn delete_task(&self, task_id: TaskId) -> anyhow::Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM event WHERE task_id = ?")
            .bind(task_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM task WHERE id = ?")
            .bind(task_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_event(&self, event_id: EventId) -> anyhow::Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM event WHERE id = ?")
            .bind(event_id)
            .execute(&mut *tx)
            .await?;
        Self::cleanup_orphans_tx(&mut tx).await?;
        tx.commit().await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn cleanup_old_tasks(&self, days_old: i64) -> anyhow::Result<()> {
        let cutoff = self.now() - ChronoDuration::days(days_old);
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM task WHERE retry_at < ?")
            .bind(cutoff)
            .execute(&mut *tx)
            .await?;
        Self::cleanup_orphans_tx(&mut tx).await?;
        tx.commit().await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn cleanup_old_events(&self, days_old: i64) -> anyhow::Result<()> {
        let cutoff = self.now() - ChronoDuration::days(days_old);
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM event WHERE event_at < ?")
            .bind(cutoff)
            .execute(&mut *tx)
            .await?;
        Self::cleanup_orphans_tx(&mut tx).await?;
        tx.commit().await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn cleanup_orphans(&self) -> anyhow::Result<()> {
        let mut tx = self.pool.begin().await?;
        Self::cleanup_orphans_tx(&mut tx).await?;
        tx.commit().await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn bring_task_to_front(&self, task_id: TaskId) -> anyhow::Result<()> {
        let mut tx = self.pool.begin().await?;
        let queue_id: i64 = sqlx::query_scalar("SELECT queue_id FROM task WHERE id = ?")
            .bind(task_id)
            .fetch_one(&mut *tx)
            .await?;
        let min_priority: Option<i64> = sqlx::query_scalar(
            "SELECT MIN(priority) FROM task WHERE queue_id = ? AND status = 'Q'",
        )
        .bind(queue_id)
        .fetch_one(&mut *tx)
        .await?;
        let new_priority = min_priority.unwrap_or(0) - 1;
        sqlx::query("UPDATE task SET priority = ? WHERE id = ?")
            .bind(new_priority)
            .bind(task_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn send_task_to_back(&self, task_id: TaskId) -> anyhow::Result<()> {
        let mut tx = self.pool.begin().await?;
        let queue_id: i64 = sqlx::query_scalar("SELECT queue_id FROM task WHERE id = ?")
            .bind(task_id)
            .fetch_one(&mut *tx)
            .await?;
        let max_priority: Option<i64> = sqlx::query_scalar(
            "SELECT MAX(priority) FROM task WHERE queue_id = ? AND status = 'Q'",
        )
        .bind(queue_id)
        .fetch_one(&mut *tx)
        .await?;
        let new_priority = max_priority.unwrap_or(0) + 1;
        sqlx::query("UPDATE task SET priority = ? WHERE id = ?")
            .bind(new_priority)
            .bind(task_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn all_queue_names(&self) -> anyhow::Result<Vec<String>> {
        let names: Vec<String> = sqlx::query_scalar("SELECT name FROM queue ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(names)
    }

    async fn tasks(&self, kind: TaskKind) -> anyhow::Result<Vec<TaskView>> {
        let sql = match kind {
            TaskKind::All => {
                "SELECT t.*, (SELECT COUNT(*) FROM event e WHERE e.task_id = t.id) AS event_count \
                 FROM task t ORDER BY t.id DESC"
            }
            TaskKind::Failed => {
                "SELECT t.*, (SELECT COUNT(*) FROM event e WHERE e.task_id = t.id) AS event_count \
                 FROM task t WHERE t.status = 'F' ORDER BY t.id DESC"
            }
            TaskKind::Active => {
                "SELECT t.*, (SELECT COUNT(*) FROM event e WHERE e.task_id = t.id) AS event_count \
                 FROM task t WHERE t.status != 'S' ORDER BY t.id DESC"
            }
            TaskKind::Queued => {
                "SELECT t.*, (SELECT COUNT(*) FROM event e WHERE e.task_id = t.id) AS event_count \
                 FROM task t WHERE t.status = 'Q' ORDER BY t.id DESC"
            }
        };

        let rows = sqlx::query(sql).fetch_all(&self.pool).await?;
        rows.iter().map(Self::row_to_task_view).collect()
    }

    async fn events_for_task(&self, task_id: TaskId) -> anyhow::Result<Vec<EventView>> {
        let rows = sqlx::query("SELECT * FROM event WHERE task_id = ? ORDER BY id ASC")
            .bind(task_id)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(Self::row_to_event_view).collect()
    }

    async fn all_events(&self) -> anyhow::Result<Vec<EventView>> {
        let rows = sqlx::query("SELECT * FROM event ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(Self::row_to_event_view).collect()
    }
}

impl SqliteStore {
    async fn mark_failure_tx(
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        task_id: TaskId,
        reason: &str,
        exception_blob: Option<Vec<u8>>,
    ) -> anyhow::Result<()> {
        sqlx::query(
            "UPDATE task SET status = 'F', failure_reason = ?, exception = ? WHERE id = ?",
        )
        .bind(reason)
        .bind(exception_blob)
        .bind(task_id)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod end_to_end_tests;

#[cfg(test)]
mod tests {
    use super::*;
    use taskqueue_core::model::TaskKind;

    async fn memory_store() -> SqliteStore {
        let store = SqliteStore::connect("sqlite::memory:").await.unwrap();
        store
    }

    #[tokio::test]
    async fn enqueue_and_next_task_round_trip() {
        let store = memory_store().await;
        store.get_or_create_queue("emails").await.unwrap();
        let id = store
            .enqueue("emails", 0, b"hello".to_vec(), false)
            .await
            .unwrap()
            .unwrap();

        let scheduled = store.next_task("emails").await.unwrap().unwrap();
        assert!(scheduled.eligible_now());
        assert_eq!(scheduled.task.id, id);
        assert_eq!(scheduled.task.payload_blob, b"hello");
    }

    #[tokio::test]
    async fn enqueue_against_unknown_queue_without_creating_fails() {
        let store = memory_store().await;
        let result = store.enqueue("ghost", 0, b"x".to_vec(), false).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn mark_success_without_events_deletes_row() {
        let store = memory_store().await;
        store.get_or_create_queue("q").await.unwrap();
        let id = store.enqueue("q", 0, b"x".to_vec(), false).await.unwrap().unwrap();
        store.mark_success(id).await.unwrap();

        let all = store.tasks(TaskKind::All).await.unwrap();
        assert!(all.is_empty());
    }

    #[tokio::test]
    async fn mark_success_with_events_keeps_row_succeeded() {
        let store = memory_store().await;
        store.get_or_create_queue("q").await.unwrap();
        let id = store.enqueue("q", 0, b"x".to_vec(), false).await.unwrap().unwrap();
        store.store_task_event(id, b"log line".to_vec()).await.unwrap();
        store.mark_success(id).await.unwrap();

        let all = store.tasks(TaskKind::All).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].status_code, 'S');
    }

    #[tokio::test]
    async fn mark_requeue_past_retry_limit_fails_the_task() {
        let store = memory_store().await;
        store.get_or_create_queue("q").await.unwrap();
        let id = store.enqueue("q", 0, b"x".to_vec(), false).await.unwrap().unwrap();

        store.mark_requeue(id, 0, Duration::from_secs(1)).await.unwrap();

        let failed = store.tasks(TaskKind::Failed).await.unwrap();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].failure_reason.as_deref(), Some("Retry limit exceeded"));
    }

    #[tokio::test]
    async fn priority_reshuffle_is_scoped_per_queue() {
        let store = memory_store().await;
        store.get_or_create_queue("q").await.unwrap();
        let a = store.enqueue("q", 0, b"a".to_vec(), false).await.unwrap().unwrap();
        let b = store.enqueue("q", 0, b"b".to_vec(), false).await.unwrap().unwrap();

        store.bring_task_to_front(b).await.unwrap();

        let first = store.next_task("q").await.unwrap().unwrap();
        assert_eq!(first.task.id, b);
        let _ = a;
    }

    #[tokio::test]
    async fn delete_event_prunes_orphaned_succeeded_task() {
        let store = memory_store().await;
        store.get_or_create_queue("q").await.unwrap();
        let id = store.enqueue("q", 0, b"x".to_vec(), false).await.unwrap().unwrap();
        let event_id = store
            .store_task_event(id, b"only event".to_vec())
            .await
            .unwrap()
            .unwrap();
        store.mark_success(id).await.unwrap();

        store.delete_event(event_id).await.unwrap();

        let all = store.tasks(TaskKind::All).await.unwrap();
        assert!(all.is_empty(), "orphaned succeeded task should be pruned");
    }

    #[tokio::test]
    async fn queued_tasks_survive_a_process_restart() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("queue.db");
        let url = format!("sqlite://{}", db_path.display());

        let id = {
            let store = SqliteStore::connect(&url).await.unwrap();
            store.get_or_create_queue("emails").await.unwrap();
            store.enqueue("emails", 0, b"still here".to_vec(), false).await.unwrap().unwrap()
        };

        // Fresh pool against the same file, as a restarted process would open.
        let reopened = SqliteStore::connect(&url).await.unwrap();
        let names = reopened.all_queue_names().await.unwrap();
        assert_eq!(names, vec!["emails".to_string()]);

        let scheduled = reopened.next_task("emails").await.unwrap().unwrap();
        assert_eq!(scheduled.task.id, id);
        assert_eq!(scheduled.task.payload_blob, b"still here");
    }
}
