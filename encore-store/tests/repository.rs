use encore_common::{Artist, EncoreError, Event, Program};
use encore_config::DatabaseConfig;
use encore_store::{EventRepository, SqliteEventRepository, connect};
use std::sync::Arc;
use tempfile::TempDir;

const CONCERT: &str = "https://example.org/concert";

fn db_config(dir: &TempDir) -> DatabaseConfig {
    DatabaseConfig {
        url: format!("sqlite://{}", dir.path().join("encore.db").display()),
        max_connections: 4,
    }
}

async fn repository(dir: &TempDir) -> SqliteEventRepository {
    SqliteEventRepository::new(connect(&db_config(dir)).await.unwrap())
}

fn gala() -> Event {
    Event {
        name: "Fall Gala".into(),
        date: "2024-10-05".into(),
        time: "7pm".into(),
        venue_name: "Symphony Hall".into(),
        venue_address: "301 Massachusetts Ave, Boston, MA".into(),
        patron_services_phone: "617-266-1200".into(),
        patron_services_email: "tickets@example.org".into(),
        artists: vec![
            Artist::new("Yo-Yo Ma", Some("cello")),
            Artist::new("Boston Symphony Orchestra", None),
        ],
        programs: vec![
            Program::new("Symphony No. 5", "Beethoven"),
            Program::new("Cello Concerto", "Elgar"),
        ],
        music_director: "Andris Nelsons".into(),
        event_description: "Opening night of the season.".into(),
        ticket_status: "On sale".into(),
    }
}

#[tokio::test]
async fn read_of_unwritten_url_is_none() {
    let dir = tempfile::tempdir().unwrap();
    let repo = repository(&dir).await;
    assert!(repo.read(CONCERT).await.unwrap().is_none());
}

#[tokio::test]
async fn write_then_read_returns_the_same_record() {
    let dir = tempfile::tempdir().unwrap();
    let repo = repository(&dir).await;

    let written = repo.write(CONCERT, &gala()).await.unwrap();
    assert_eq!(written.url, CONCERT);
    assert_eq!(written.event, gala());

    let read = repo.read(CONCERT).await.unwrap().unwrap();
    assert_eq!(read, written);
    assert_eq!(read.event.artists[1].instrument, None);
    assert_eq!(read.event.programs[1].composer, "Elgar");
}

#[tokio::test]
async fn empty_event_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let repo = repository(&dir).await;

    repo.write(CONCERT, &Event::default()).await.unwrap();
    let read = repo.read(CONCERT).await.unwrap().unwrap();
    assert_eq!(read.event, Event::default());
}

#[tokio::test]
async fn most_recent_write_wins() {
    let dir = tempfile::tempdir().unwrap();
    let repo = repository(&dir).await;

    let first = repo.write(CONCERT, &gala()).await.unwrap();
    let mut updated = gala();
    updated.ticket_status = "Sold out".into();
    updated.artists.truncate(1);
    let second = repo.write(CONCERT, &updated).await.unwrap();
    assert_ne!(first.id, second.id);

    let read = repo.read(CONCERT).await.unwrap().unwrap();
    assert_eq!(read.id, second.id);
    assert_eq!(read.event.ticket_status, "Sold out");
    assert_eq!(read.event.artists.len(), 1);
}

#[tokio::test]
async fn lookup_is_by_exact_url() {
    let dir = tempfile::tempdir().unwrap();
    let repo = repository(&dir).await;

    repo.write(CONCERT, &gala()).await.unwrap();
    assert!(repo.read("https://example.org/concert/").await.unwrap().is_none());
    assert!(repo.read("https://EXAMPLE.org/concert").await.unwrap().is_none());
}

#[tokio::test]
async fn reconnecting_keeps_data_and_reruns_migrations_cleanly() {
    let dir = tempfile::tempdir().unwrap();
    let written = repository(&dir).await.write(CONCERT, &gala()).await.unwrap();

    let reopened = repository(&dir).await;
    assert_eq!(reopened.read(CONCERT).await.unwrap().unwrap().id, written.id);
}

#[tokio::test]
async fn concurrent_writes_all_land() {
    let dir = tempfile::tempdir().unwrap();
    let repo = Arc::new(repository(&dir).await);

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let repo = repo.clone();
            tokio::spawn(async move {
                let url = format!("https://example.org/concert/{i}");
                repo.write(&url, &gala()).await.map(|r| r.url)
            })
        })
        .collect();

    for handle in handles {
        let url = handle.await.unwrap().unwrap();
        assert!(repo.read(&url).await.unwrap().is_some());
    }
}

#[tokio::test]
async fn closed_pool_is_a_storage_failure() {
    let dir = tempfile::tempdir().unwrap();
    let pool = connect(&db_config(&dir)).await.unwrap();
    let repo = SqliteEventRepository::new(pool.clone());
    pool.close().await;

    assert!(matches!(
        repo.read(CONCERT).await,
        Err(EncoreError::StorageFailure(_))
    ));
    assert!(matches!(
        repo.write(CONCERT, &gala()).await,
        Err(EncoreError::StorageFailure(_))
    ));
}

#[tokio::test]
async fn unreachable_database_fails_to_connect() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = DatabaseConfig {
        url: format!(
            "sqlite://{}",
            dir.path().join("missing").join("nested").join("encore.db").display()
        ),
        max_connections: 1,
    };
    assert!(matches!(
        connect(&cfg).await,
        Err(EncoreError::StorageFailure(_))
    ));
}
