//! SQLite-backed persistence for extracted events.
//!
//! Every save appends a row to `entities_master` plus its ordered artists
//! and program pieces; nothing is ever updated or deleted. Reads return the
//! most recent record for an exact URL.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use encore_common::{Artist, EncoreError, Event, Program, Result, StoredRecord};
use encore_config::DatabaseConfig;
use sqlx::migrate::Migrator;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Row, SqliteConnection, SqlitePool};
use std::str::FromStr;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

fn storage(err: impl std::fmt::Display) -> EncoreError {
    EncoreError::StorageFailure(err.to_string())
}

/// Open the pool described by `config` and bring the schema up to date.
///
/// Migrations are idempotent; running this against an existing database is
/// a no-op apart from the connection itself.
pub async fn connect(config: &DatabaseConfig) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(&config.url)
        .map_err(storage)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5))
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .connect_with(options)
        .await
        .map_err(|e| {
            warn!(target: "store", url = %config.url, error = %e, "store.connect_failed");
            storage(e)
        })?;

    MIGRATOR.run(&pool).await.map_err(storage)?;
    info!(target: "store", url = %config.url, "store.ready");
    Ok(pool)
}

#[async_trait]
pub trait EventRepository: Send + Sync {
    /// Append a new record for `url`. Never updates an existing one.
    async fn write(&self, url: &str, event: &Event) -> Result<StoredRecord>;

    /// The most recent record stored for exactly `url`, if any.
    async fn read(&self, url: &str) -> Result<Option<StoredRecord>>;
}

pub struct SqliteEventRepository {
    pool: SqlitePool,
}

impl SqliteEventRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EventRepository for SqliteEventRepository {
    async fn write(&self, url: &str, event: &Event) -> Result<StoredRecord> {
        let started = Instant::now();
        let record = StoredRecord {
            id: Uuid::new_v4(),
            url: url.to_string(),
            created_at: now_millis(),
            event: event.clone(),
        };
        let id = record.id.to_string();

        // Dropping the transaction without commit rolls it back.
        let mut tx = self.pool.begin().await.map_err(storage)?;

        sqlx::query(
            r#"INSERT INTO entities_master
               (id, url, event_name, event_date, event_time, venue_name, venue_address,
                patron_services_phone, patron_services_email, music_director,
                event_description, ticket_status, created_at)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)"#,
        )
        .bind(id.as_str())
        .bind(url)
        .bind(event.name.as_str())
        .bind(event.date.as_str())
        .bind(event.time.as_str())
        .bind(event.venue_name.as_str())
        .bind(event.venue_address.as_str())
        .bind(event.patron_services_phone.as_str())
        .bind(event.patron_services_email.as_str())
        .bind(event.music_director.as_str())
        .bind(event.event_description.as_str())
        .bind(event.ticket_status.as_str())
        .bind(format_timestamp(&record.created_at))
        .execute(&mut *tx)
        .await
        .map_err(storage)?;

        for (position, artist) in event.artists.iter().enumerate() {
            sqlx::query(
                r#"INSERT INTO entity_artist (entity_id, position, name, instrument)
                   VALUES (?1, ?2, ?3, ?4)"#,
            )
            .bind(id.as_str())
            .bind(position as i64)
            .bind(artist.name.as_str())
            .bind(artist.instrument.as_deref())
            .execute(&mut *tx)
            .await
            .map_err(storage)?;
        }

        for (position, program) in event.programs.iter().enumerate() {
            sqlx::query(
                r#"INSERT INTO entity_program (entity_id, position, title, composer)
                   VALUES (?1, ?2, ?3, ?4)"#,
            )
            .bind(id.as_str())
            .bind(position as i64)
            .bind(program.title.as_str())
            .bind(program.composer.as_str())
            .execute(&mut *tx)
            .await
            .map_err(storage)?;
        }

        tx.commit().await.map_err(storage)?;
        info!(
            target: "store",
            record_id = %record.id,
            %url,
            artists = event.artists.len(),
            programs = event.programs.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "store.write"
        );
        Ok(record)
    }

    async fn read(&self, url: &str) -> Result<Option<StoredRecord>> {
        let mut conn = self.pool.acquire().await.map_err(storage)?;

        let row = sqlx::query(
            r#"SELECT id, url, event_name, event_date, event_time, venue_name, venue_address,
                      patron_services_phone, patron_services_email, music_director,
                      event_description, ticket_status, created_at
               FROM entities_master
               WHERE url = ?1
               ORDER BY seq DESC
               LIMIT 1"#,
        )
        .bind(url)
        .fetch_optional(&mut *conn)
        .await
        .map_err(storage)?;

        let Some(row) = row else {
            debug!(target: "store", %url, "store.read.miss");
            return Ok(None);
        };

        let id: String = row.try_get("id").map_err(storage)?;
        let created_at: String = row.try_get("created_at").map_err(storage)?;
        let mut event = Event {
            name: row.try_get("event_name").map_err(storage)?,
            date: row.try_get("event_date").map_err(storage)?,
            time: row.try_get("event_time").map_err(storage)?,
            venue_name: row.try_get("venue_name").map_err(storage)?,
            venue_address: row.try_get("venue_address").map_err(storage)?,
            patron_services_phone: row.try_get("patron_services_phone").map_err(storage)?,
            patron_services_email: row.try_get("patron_services_email").map_err(storage)?,
            music_director: row.try_get("music_director").map_err(storage)?,
            event_description: row.try_get("event_description").map_err(storage)?,
            ticket_status: row.try_get("ticket_status").map_err(storage)?,
            ..Event::default()
        };
        event.artists = load_artists(&mut *conn, &id).await?;
        event.programs = load_programs(&mut *conn, &id).await?;

        let record = StoredRecord {
            id: Uuid::parse_str(&id).map_err(storage)?,
            url: row.try_get("url").map_err(storage)?,
            created_at: parse_timestamp(&created_at)?,
            event,
        };
        info!(target: "store", record_id = %record.id, %url, "store.read");
        Ok(Some(record))
    }
}

async fn load_artists(conn: &mut SqliteConnection, id: &str) -> Result<Vec<Artist>> {
    let rows = sqlx::query(
        r#"SELECT name, instrument FROM entity_artist
           WHERE entity_id = ?1 ORDER BY position ASC"#,
    )
    .bind(id)
    .fetch_all(&mut *conn)
    .await
    .map_err(storage)?;

    rows.into_iter()
        .map(|r| {
            Ok(Artist {
                name: r.try_get("name").map_err(storage)?,
                instrument: r.try_get("instrument").map_err(storage)?,
            })
        })
        .collect()
}

async fn load_programs(conn: &mut SqliteConnection, id: &str) -> Result<Vec<Program>> {
    let rows = sqlx::query(
        r#"SELECT title, composer FROM entity_program
           WHERE entity_id = ?1 ORDER BY position ASC"#,
    )
    .bind(id)
    .fetch_all(&mut *conn)
    .await
    .map_err(storage)?;

    rows.into_iter()
        .map(|r| {
            Ok(Program {
                title: r.try_get("title").map_err(storage)?,
                composer: r.try_get("composer").map_err(storage)?,
            })
        })
        .collect()
}

/// Current time truncated to what the store keeps.
fn now_millis() -> DateTime<Utc> {
    let now = Utc::now();
    DateTime::from_timestamp_millis(now.timestamp_millis()).unwrap_or(now)
}

fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| storage(format!("bad created_at {raw:?}: {e}")))
}
