//! Test fixture lifecycle
//!
//! A [`Fixture`] is created once per test group. Creating it bootstraps the
//! application, rebuilds the fixture database (delete, recreate, migrate, seed,
//! E2E seed), makes sure the artifact directory exists and, if configured,
//! starts the app server. Any failure there aborts the whole group.
//!
//! Browser sessions are per test: [`Fixture::open_session`] is setUp (new
//! session, navigate to the app) and [`Fixture::finish`] is tearDown (failure
//! screenshot, quit). [`Fixture::run`] pairs them so teardown also happens
//! when the test fails. The database is shared by every test of the group and
//! is not reset between them.

use std::path::{Path, PathBuf};

use futures::future::BoxFuture;
use koel_app::{Application, Database};
use tracing::{error, info, warn};

use crate::config::HarnessConfig;
use crate::driver::{Driver, RemoteDriver};
use crate::error::E2eResult;
use crate::server::ServerHandle;
use crate::session::{Screenshot, Session};
use crate::wait::Waiter;

/// Config file looked up by [`Fixture::from_env`] unless `KOEL_E2E_CONFIG` says otherwise
pub const DEFAULT_CONFIG_FILE: &str = "koel-e2e.toml";

pub struct Fixture {
    config: HarnessConfig,
    app: Application,
    database: Database,
    server: Option<ServerHandle>,
}

impl Fixture {
    /// Bootstrap the app and rebuild the fixture database
    pub async fn new(config: HarnessConfig) -> E2eResult<Self> {
        info!("Preparing E2E fixture");

        let app = Application::bootstrap(config.app.clone())?;
        let database = app.prepare_database()?;
        info!(
            "Fixture database ready at {} ({} users, {} songs)",
            database.path().display(),
            database.count("users")?,
            database.count("songs")?
        );

        ensure_artifact_dir(&config.artifact_dir)?;

        let server = match &config.server {
            Some(server) => {
                Some(ServerHandle::spawn(server, app.root(), &config.app.db_connection).await?)
            }
            None => None,
        };

        Ok(Self {
            config,
            app,
            database,
            server,
        })
    }

    /// Load `koel-e2e.toml` (or `$KOEL_E2E_CONFIG`), apply env overrides, then bootstrap
    pub async fn from_env() -> E2eResult<Self> {
        Self::new(Self::config_from_env()?).await
    }

    pub fn config_from_env() -> E2eResult<HarnessConfig> {
        let path = std::env::var("KOEL_E2E_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_FILE));
        HarnessConfig::load(&path)?.apply_env()
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn app(&self) -> &Application {
        &self.app
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    pub fn artifact_dir(&self) -> &Path {
        &self.config.artifact_dir
    }

    /// URL of the app under test (the spawned server's when there is one)
    pub fn app_url(&self) -> &str {
        match &self.server {
            Some(server) => server.base_url(),
            None => &self.config.app_url,
        }
    }

    pub fn waiter(&self) -> Waiter {
        Waiter::from(self.config.wait)
    }

    /// setUp: open a browser session and load the app
    pub async fn open_session(&self) -> E2eResult<Session> {
        let driver = RemoteDriver::connect(
            &self.config.webdriver_url,
            self.config.browser,
            self.config.headless,
        )
        .await?;
        self.start(driver).await
    }

    /// setUp over an already connected driver
    pub async fn start<D: Driver>(&self, driver: D) -> E2eResult<Session<D>> {
        let mut session = Session::new(driver, self.app_url(), self.waiter());
        if let Err(e) = session.open_app().await {
            let _ = session.quit().await;
            return Err(e);
        }
        Ok(session)
    }

    /// tearDown: screenshot when the test failed, then quit the session.
    ///
    /// A screenshot that cannot be taken is logged and skipped; a failed
    /// quit is returned.
    pub async fn finish<D: Driver>(
        &self,
        session: &mut Session<D>,
        name: &str,
        failed: bool,
    ) -> E2eResult<Option<Screenshot>> {
        let screenshot = if failed {
            match session.screenshot(self.artifact_dir(), name).await {
                Ok(shot) => Some(shot),
                Err(e) => {
                    warn!("Could not capture failure screenshot for {}: {}", name, e);
                    None
                }
            }
        } else {
            None
        };

        session.quit().await?;
        Ok(screenshot)
    }

    /// Run one test against a fresh session, always tearing it down
    pub async fn run<F>(&self, name: &str, test: F) -> E2eResult<()>
    where
        F: for<'s> FnOnce(&'s mut Session) -> BoxFuture<'s, E2eResult<()>>,
    {
        let session = self.open_session().await?;
        self.run_in(session, name, test).await
    }

    /// [`Fixture::run`] with a session the caller opened
    pub async fn run_in<D, F>(&self, mut session: Session<D>, name: &str, test: F) -> E2eResult<()>
    where
        D: Driver,
        F: for<'s> FnOnce(&'s mut Session<D>) -> BoxFuture<'s, E2eResult<()>>,
    {
        info!("Running {}", name);
        let outcome = test(&mut session).await;

        if let Err(e) = &outcome {
            error!("{} failed: {}", name, e);
        }
        let teardown = self.finish(&mut session, name, outcome.is_err()).await;

        // The test's own failure is the one worth reporting
        outcome?;
        teardown.map(|_| ())
    }
}

/// Create the artifact directory (and parents) world-writable if it is missing
pub fn ensure_artifact_dir(dir: &Path) -> E2eResult<()> {
    if dir.exists() {
        return Ok(());
    }
    std::fs::create_dir_all(dir)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(dir, std::fs::Permissions::from_mode(0o777))?;
    }

    info!("Created artifact directory {}", dir.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::fake::FakeDriver;
    use crate::error::E2eError;
    use crate::session::{sidebar_link, wrapper_id, USER_BADGE_NAME};
    use std::time::Duration;
    use tempfile::TempDir;

    fn config_in(tmp: &TempDir) -> HarnessConfig {
        let mut config = HarnessConfig::default();
        config.app = koel_app::AppConfig::rooted_at(tmp.path());
        config.artifact_dir = tmp.path().join("artifacts").join("screens");
        config.wait.timeout_ms = 80;
        config.wait.interval_ms = 5;
        config
    }

    fn page() -> FakeDriver {
        FakeDriver::default()
            .with_element("#app", "")
            .with_element(crate::session::LOGIN_EMAIL_INPUT, "")
            .with_element(crate::session::LOGIN_PASSWORD_INPUT, "")
            .on_show("keys", USER_BADGE_NAME, "Koel Admin")
            .with_element(&sidebar_link("favorites"), "")
            .on_show(
                &format!("click:{}", sidebar_link("favorites")),
                &wrapper_id("favorites"),
                "",
            )
    }

    #[tokio::test]
    async fn test_new_prepares_database_and_artifacts() {
        let tmp = TempDir::new().unwrap();
        let fixture = Fixture::new(config_in(&tmp)).await.unwrap();

        assert!(tmp.path().join("database/e2e.sqlite").exists());
        assert_eq!(fixture.database().count("users").unwrap(), 1);
        assert!(fixture.database().count("songs").unwrap() > 0);
        assert!(fixture.artifact_dir().is_dir());

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(fixture.artifact_dir())
                .unwrap()
                .permissions()
                .mode();
            assert_eq!(mode & 0o777, 0o777);
        }
    }

    #[tokio::test]
    async fn test_start_navigates_to_app_url() {
        let tmp = TempDir::new().unwrap();
        let fixture = Fixture::new(config_in(&tmp)).await.unwrap();

        let mut session = fixture.start(page()).await.unwrap();

        assert_eq!(session.driver().log, vec!["navigate:http://localhost:8081"]);
    }

    #[tokio::test]
    async fn test_run_in_quits_after_success() {
        let tmp = TempDir::new().unwrap();
        let fixture = Fixture::new(config_in(&tmp)).await.unwrap();
        let session = fixture.start(page()).await.unwrap();

        fixture
            .run_in(session, "favorites", |s| {
                Box::pin(async move {
                    s.login_and_go_to("favorites").await?;
                    assert!(s.see("#favoritesWrapper").await?);
                    Ok::<(), E2eError>(())
                })
            })
            .await
            .unwrap();

        assert_eq!(std::fs::read_dir(fixture.artifact_dir()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_run_in_reports_test_error_and_screenshots() {
        let tmp = TempDir::new().unwrap();
        let fixture = Fixture::new(config_in(&tmp)).await.unwrap();
        let session = fixture.start(page()).await.unwrap();

        let err = fixture
            .run_in(session, "missing screen", |s| {
                Box::pin(async move {
                    s.wait_until_seen("#nothingWrapper").await?;
                    Ok::<(), E2eError>(())
                })
            })
            .await
            .unwrap_err();

        assert!(err.is_timeout());
        let shots: Vec<_> = std::fs::read_dir(fixture.artifact_dir())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(shots.len(), 1);
        assert!(shots[0].starts_with("missing-screen-"));
    }

    #[tokio::test]
    async fn test_finish_surfaces_double_quit() {
        let tmp = TempDir::new().unwrap();
        let fixture = Fixture::new(config_in(&tmp)).await.unwrap();
        let mut session = fixture.start(page()).await.unwrap();

        fixture.finish(&mut session, "once", false).await.unwrap();
        let err = fixture.finish(&mut session, "twice", false).await.unwrap_err();
        assert!(matches!(err, E2eError::SessionClosed));
    }

    #[tokio::test]
    async fn test_unreachable_webdriver_is_fatal() {
        let tmp = TempDir::new().unwrap();
        let mut config = config_in(&tmp);
        config.webdriver_url = "http://127.0.0.1:9/wd/hub".to_string();
        let fixture = Fixture::new(config).await.unwrap();

        let result = tokio::time::timeout(Duration::from_secs(30), fixture.open_session()).await;
        assert!(matches!(result, Ok(Err(E2eError::Session(_)))));
    }

    #[test]
    fn test_fixture_can_be_shared_between_tests() {
        fn shared<T: Send + Sync + 'static>() {}
        shared::<Fixture>();
    }

    #[test]
    fn test_existing_artifact_dir_is_left_alone() {
        let tmp = TempDir::new().unwrap();
        ensure_artifact_dir(tmp.path()).unwrap();
        assert!(tmp.path().is_dir());
    }
}
