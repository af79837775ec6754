//! Lifecycle tests for the ephemeral test database.
//!
//! Covers session release on every exit path, sharing one database across
//! sessions, file cleanup after teardown and after failed setup. Needs the
//! `test-utils` feature: `cargo test -p linea-db --features test-utils`.

mod common;

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use common::{assert_all_sessions_released, seeded_db};
use linea_core::{NewCategory, RepositoryError};
use linea_db::{LifecycleState, ProductFilter, SeedError, TestDb, TestDbError, TestSession};

#[tokio::test]
async fn sessions_are_released_after_normal_return() {
    let db = seeded_db().await;

    for _ in 0..3 {
        let mut session = db.session().await.unwrap();
        session.categories().list().await.unwrap();
    }

    assert_all_sessions_released(&db).await;
    tokio_test::assert_ok!(db.teardown().await);
}

#[tokio::test]
async fn sessions_are_released_after_early_error_return() {
    let db = seeded_db().await;

    async fn failing_unit_of_work(db: &linea_db::TestDb) -> Result<(), RepositoryError> {
        let mut session = db.session().await?;
        session.products().get(999_999).await?;
        Ok(())
    }

    let err = failing_unit_of_work(&db).await.unwrap_err();
    assert!(matches!(err, RepositoryError::NotFound(_)));

    assert_all_sessions_released(&db).await;
    tokio_test::assert_ok!(db.teardown().await);
}

#[tokio::test]
async fn sessions_are_released_after_panic() {
    let db = Arc::new(seeded_db().await);

    let task_db = Arc::clone(&db);
    let result = tokio::spawn(async move {
        let mut session = task_db.session().await.unwrap();
        session.categories().list().await.unwrap();
        panic!("test body failed while holding a session");
    })
    .await;
    assert!(result.unwrap_err().is_panic());

    assert_all_sessions_released(&db).await;
    let db = Arc::try_unwrap(db).expect("no other references remain");
    tokio_test::assert_ok!(db.teardown().await);
}

#[tokio::test]
async fn committed_writes_are_visible_to_later_sessions() {
    let db = seeded_db().await;

    let created = {
        let mut session = db.session().await.unwrap();
        session
            .categories()
            .create(&NewCategory::new("garden"))
            .await
            .unwrap()
    };

    let mut session = db.session().await.unwrap();
    let fetched = session.categories().get(created.id).await.unwrap();
    assert_eq!(fetched.name, "garden");
    drop(session);

    assert_all_sessions_released(&db).await;
    tokio_test::assert_ok!(db.teardown().await);
}

#[tokio::test]
async fn seeded_rows_match_fixture_data() {
    let db = seeded_db().await;
    let mut session = db.session().await.unwrap();

    let product = session.products().get(1).await.unwrap();
    assert_eq!(product.title, "Fjallraven - Foldsack No. 1 Backpack, Fits 15 Laptops");
    assert!((product.price - 109.95).abs() < f64::EPSILON);

    let electronics = session
        .categories()
        .find_by_name("electronics")
        .await
        .unwrap()
        .unwrap();
    let in_category = session
        .products()
        .list(&ProductFilter::in_category(electronics.id))
        .await
        .unwrap();
    let mut ids: Vec<i64> = in_category.iter().map(|p| p.id).collect();
    ids.sort_unstable();
    assert_eq!(ids, vec![9, 10]);

    drop(session);
    tokio_test::assert_ok!(db.teardown().await);
}

#[tokio::test]
async fn teardown_removes_the_backing_file() {
    let db = seeded_db().await;
    assert_eq!(db.state(), LifecycleState::Serving);
    let path = db.path().unwrap().to_path_buf();
    assert!(path.exists());

    tokio_test::assert_ok!(db.teardown().await);

    assert!(!path.exists());
    let reopen = std::fs::OpenOptions::new().read(true).open(&path);
    assert_eq!(reopen.unwrap_err().kind(), std::io::ErrorKind::NotFound);
}

#[tokio::test]
async fn shared_session_creates_database_once() {
    let session = TestSession::new();

    let path = session.db().await.unwrap().path().unwrap().to_path_buf();
    {
        let db = session.db().await.unwrap();
        let mut unit = db.session().await.unwrap();
        unit.categories()
            .create(&NewCategory::new("written-by-first-test"))
            .await
            .unwrap();
    }

    // A second consumer sees the first one's write: same database, no reseed.
    let db = session.db().await.unwrap();
    assert_eq!(db.path().unwrap(), path.as_path());
    let mut unit = db.session().await.unwrap();
    assert!(
        unit.categories()
            .find_by_name("written-by-first-test")
            .await
            .unwrap()
            .is_some()
    );
    drop(unit);
    assert_eq!(session.initializations(), 1);

    session.finish().await.unwrap();
    assert!(!path.exists());
}

#[tokio::test]
async fn failed_seed_removes_the_backing_file() {
    let seen: Arc<Mutex<Option<PathBuf>>> = Arc::new(Mutex::new(None));
    let capture = Arc::clone(&seen);

    let result = TestDb::create_with(|pool| async move {
        let (file,): (String,) =
            sqlx::query_as("SELECT file FROM pragma_database_list WHERE name = 'main'")
                .fetch_one(&pool)
                .await
                .unwrap();
        // Schema is in place before seeding starts.
        let (tables,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'products'",
        )
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(tables, 1);

        *capture.lock().unwrap() = Some(PathBuf::from(file));
        Err(SeedError::MissingReference {
            kind: "delivery option",
            name: "Teleport".to_string(),
        })
    })
    .await;

    let err = tokio_test::assert_err!(result);
    assert!(matches!(
        err,
        TestDbError::Setup {
            reached: LifecycleState::SchemaReady,
            ..
        }
    ));

    let path = seen.lock().unwrap().clone().expect("seeder ran");
    assert!(!path.exists());
}

#[tokio::test]
async fn teardown_reports_a_file_that_cannot_be_removed() {
    let db = seeded_db().await;
    let path = db.path().unwrap().to_path_buf();
    std::fs::remove_file(&path).unwrap();

    let err = tokio_test::assert_err!(db.teardown().await);
    match err {
        TestDbError::Teardown(io) => assert_eq!(io.kind(), std::io::ErrorKind::NotFound),
        other => panic!("expected teardown error, got {other:?}"),
    }
}
