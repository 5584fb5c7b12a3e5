use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::{FromRow, Row};
use tracing::info;

use backend_domain::{EventRepository, NewScanEvent, ScanEvent, ScanType};

// Legacy rows may carry NULL coordinates or location.
const SELECT_COLUMNS: &str = "SELECT id, name, admission_no, scan_type, timestamp, \
     CAST(COALESCE(latitude, 0) AS REAL) AS latitude, \
     CAST(COALESCE(longitude, 0) AS REAL) AS longitude, \
     COALESCE(location, 'Location Unknown') AS location FROM scan_events";

/// Columns older layouts of the table may lack, with the definition used to
/// add them in place.
const ADDABLE_COLUMNS: &[(&str, &str)] = &[
    ("latitude", "latitude REAL NOT NULL DEFAULT 0.0"),
    ("longitude", "longitude REAL NOT NULL DEFAULT 0.0"),
    ("location", "location TEXT NOT NULL DEFAULT 'Location Unknown'"),
    ("scan_type", "scan_type TEXT NOT NULL DEFAULT ''"),
];

const REQUIRED_COLUMNS: &[&str] = &["id", "name", "admission_no", "timestamp"];

#[derive(Debug, FromRow)]
struct ScanEventRow {
    id: i64,
    name: String,
    admission_no: String,
    scan_type: String,
    timestamp: String,
    latitude: f64,
    longitude: f64,
    location: String,
}

impl TryFrom<ScanEventRow> for ScanEvent {
    type Error = anyhow::Error;

    fn try_from(row: ScanEventRow) -> Result<Self> {
        let scan_type = ScanType::from_str(&row.scan_type)
            .with_context(|| format!("corrupt scan_type in row {}", row.id))?;
        Ok(ScanEvent {
            id: row.id,
            name: row.name,
            admission_no: row.admission_no,
            scan_type,
            timestamp: row.timestamp,
            latitude: row.latitude,
            longitude: row.longitude,
            location: row.location,
        })
    }
}

fn into_events(rows: Vec<ScanEventRow>) -> Result<Vec<ScanEvent>> {
    rows.into_iter().map(ScanEvent::try_from).collect()
}

#[derive(Clone)]
pub struct SqliteEventRepository {
    pool: SqlitePool,
}

impl SqliteEventRepository {
    /// Opens (creating if needed) the database file at `path`.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .with_context(|| format!("failed to open scan store at {}", path.display()))?;
        info!(path = %path.display(), "scan store opened");
        Ok(Self { pool })
    }

    /// Private in-memory database. Pinned to one connection that never
    /// expires, since each SQLite memory connection is its own database.
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .context("failed to open in-memory scan store")?;
        Ok(Self { pool })
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn existing_columns(&self) -> Result<HashSet<String>> {
        let rows = sqlx::query("PRAGMA table_info(scan_events)")
            .fetch_all(&self.pool)
            .await?;
        rows.iter()
            .map(|row| row.try_get::<String, _>("name").map_err(|err| anyhow!(err)))
            .collect()
    }

    /// Fills `scan_type` on rows written before the column existed, replaying
    /// the entry/exit alternation per badge in insertion order.
    async fn backfill_scan_types(&self, legacy_entry_exit: bool) -> Result<u64> {
        let mut tx = self.pool.begin().await?;

        if legacy_entry_exit {
            sqlx::query(
                "UPDATE scan_events SET scan_type = entry_exit \
                 WHERE scan_type = '' AND entry_exit IN ('Entry', 'Exit')",
            )
            .execute(&mut *tx)
            .await?;
        }

        let rows: Vec<(i64, String, String)> =
            sqlx::query_as("SELECT id, admission_no, scan_type FROM scan_events ORDER BY id")
                .fetch_all(&mut *tx)
                .await?;

        let mut latest: HashMap<String, ScanType> = HashMap::new();
        let mut filled = 0u64;
        for (id, admission_no, raw_type) in rows {
            let scan_type = match ScanType::from_str(&raw_type) {
                Ok(existing) => existing,
                Err(_) => {
                    let inferred = ScanType::following(latest.get(&admission_no).copied());
                    sqlx::query("UPDATE scan_events SET scan_type = ? WHERE id = ?")
                        .bind(inferred.as_str())
                        .bind(id)
                        .execute(&mut *tx)
                        .await?;
                    filled += 1;
                    inferred
                }
            };
            latest.insert(admission_no, scan_type);
        }

        tx.commit().await?;
        Ok(filled)
    }
}

#[async_trait]
impl EventRepository for SqliteEventRepository {
    async fn ensure_schema(&self) -> Result<()> {
        let create_events = r#"
CREATE TABLE IF NOT EXISTS scan_events (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    admission_no TEXT NOT NULL,
    scan_type TEXT NOT NULL,
    timestamp TEXT NOT NULL,
    latitude REAL NOT NULL DEFAULT 0.0,
    longitude REAL NOT NULL DEFAULT 0.0,
    location TEXT NOT NULL DEFAULT 'Location Unknown'
)
"#;
        sqlx::query(create_events)
            .execute(&self.pool)
            .await
            .context("failed to create scan_events")?;

        let columns = self.existing_columns().await?;
        for required in REQUIRED_COLUMNS {
            if !columns.contains(*required) {
                bail!(
                    "existing scan_events table has no '{}' column; refusing to migrate",
                    required
                );
            }
        }

        let mut added_scan_type = false;
        for (column, definition) in ADDABLE_COLUMNS {
            if columns.contains(*column) {
                continue;
            }
            sqlx::query(&format!("ALTER TABLE scan_events ADD COLUMN {}", definition))
                .execute(&self.pool)
                .await
                .with_context(|| format!("failed to add column {}", column))?;
            info!(column = *column, "scan_events column added");
            added_scan_type |= *column == "scan_type";
        }

        if added_scan_type {
            let filled = self
                .backfill_scan_types(columns.contains("entry_exit"))
                .await
                .context("failed to backfill scan_type")?;
            info!(rows = filled, "scan_type backfilled");
        }

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_scan_events_admission \
             ON scan_events(admission_no, timestamp, id)",
        )
        .execute(&self.pool)
        .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_scan_events_timestamp ON scan_events(timestamp)")
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn insert_event(&self, event: &NewScanEvent) -> Result<i64> {
        let result = sqlx::query(
            "INSERT INTO scan_events \
             (name, admission_no, scan_type, timestamp, latitude, longitude, location) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&event.name)
        .bind(&event.admission_no)
        .bind(event.scan_type.as_str())
        .bind(&event.timestamp)
        .bind(event.coordinates.latitude)
        .bind(event.coordinates.longitude)
        .bind(&event.location)
        .execute(&self.pool)
        .await
        .context("failed to insert scan event")?;
        Ok(result.last_insert_rowid())
    }

    async fn fetch_all(&self) -> Result<Vec<ScanEvent>> {
        let rows = sqlx::query_as::<_, ScanEventRow>(&format!("{} ORDER BY id", SELECT_COLUMNS))
            .fetch_all(&self.pool)
            .await?;
        into_events(rows)
    }

    async fn fetch_by_date_prefix(&self, date: &str) -> Result<Vec<ScanEvent>> {
        // substr rather than LIKE so '_' and '%' in the input stay literal.
        let query = format!(
            "{} WHERE substr(timestamp, 1, length(?)) = ? ORDER BY id",
            SELECT_COLUMNS
        );
        let rows = sqlx::query_as::<_, ScanEventRow>(&query)
            .bind(date)
            .bind(date)
            .fetch_all(&self.pool)
            .await?;
        into_events(rows)
    }

    async fn fetch_most_recent_for(&self, admission_no: &str) -> Result<Option<ScanEvent>> {
        let query = format!(
            "{} WHERE admission_no = ? ORDER BY timestamp DESC, id DESC LIMIT 1",
            SELECT_COLUMNS
        );
        let row = sqlx::query_as::<_, ScanEventRow>(&query)
            .bind(admission_no)
            .fetch_optional(&self.pool)
            .await?;
        row.map(ScanEvent::try_from).transpose()
    }

    async fn fetch_most_recent_located(&self) -> Result<Option<ScanEvent>> {
        let query = format!(
            "{} WHERE NOT (latitude = 0 AND longitude = 0) ORDER BY timestamp DESC, id DESC LIMIT 1",
            SELECT_COLUMNS
        );
        let row = sqlx::query_as::<_, ScanEventRow>(&query)
            .fetch_optional(&self.pool)
            .await?;
        row.map(ScanEvent::try_from).transpose()
    }

    async fn fetch_latest_timestamp(&self) -> Result<Option<String>> {
        let timestamp: Option<String> =
            sqlx::query_scalar("SELECT timestamp FROM scan_events ORDER BY id DESC LIMIT 1")
                .fetch_optional(&self.pool)
                .await?;
        Ok(timestamp)
    }

    async fn ping(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1").fetch_one(&self.pool).await?;
        Ok(())
    }
}
