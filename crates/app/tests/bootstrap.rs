//! Fixture database bootstrap against the embedded kernel
//!
//! These run without a browser or PHP: they check the database side of the
//! fixture lifecycle end to end.

use koel_app::seeders::{E2EDataSeeder, ADMIN_EMAIL};
use koel_app::{AppConfig, Application, Database};
use tempfile::TempDir;

fn app_in(tmp: &TempDir) -> Application {
    Application::bootstrap(AppConfig::rooted_at(tmp.path())).expect("bootstrap")
}

#[test]
fn fresh_run_has_seeded_account_and_library() {
    let tmp = TempDir::new().expect("create temp dir");
    let app = app_in(&tmp);

    let db = app.prepare_database().expect("prepare database");

    assert!(std::fs::metadata(app.database_path()).unwrap().len() > 0);
    assert_eq!(db.count("users").unwrap(), 1);
    assert_eq!(
        db.count("songs").unwrap(),
        E2EDataSeeder::default().total_songs() as i64
    );

    let conn = db.connection();
    let email: String = conn
        .lock()
        .query_row("SELECT email FROM users LIMIT 1", [], |row| row.get(0))
        .unwrap();
    assert_eq!(email, ADMIN_EMAIL);
}

#[test]
fn second_run_does_not_append_to_previous_rows() {
    let tmp = TempDir::new().expect("create temp dir");
    let app = app_in(&tmp);

    let first = app.prepare_database().expect("first run");
    first
        .connection()
        .lock()
        .execute(
            "INSERT INTO users (name, email, password) VALUES ('Stray', 'stray@example.com', 'x')",
            [],
        )
        .unwrap();
    drop(first);

    let second = app.prepare_database().expect("second run");

    assert_eq!(second.count("users").unwrap(), 1);
    assert_eq!(
        second.count("songs").unwrap(),
        E2EDataSeeder::default().total_songs() as i64
    );
}

#[test]
fn database_path_defaults_under_app_root() {
    let tmp = TempDir::new().expect("create temp dir");
    let app = app_in(&tmp);

    app.prepare_database().expect("prepare database");

    assert!(tmp.path().join("database").join("e2e.sqlite").exists());
    assert!(Database::open(app.database_path())
        .unwrap()
        .has_table("migrations")
        .unwrap());
}
