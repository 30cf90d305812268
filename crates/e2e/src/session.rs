//! Browser session and the interaction shortcuts tests are written in
//!
//! A [`Session`] wraps one driven browser tab. Alongside the raw verbs
//! (`click`, `type_in`, `enter`, waits) it carries the Koel vocabulary:
//! `login`, `login_and_wait`, `goto`, `login_and_go_to`, `focus_into_app`.
//! Every shortcut returns `&mut Self` so flows chain:
//!
//! ```ignore
//! session.login_and_wait().await?.goto("favorites").await?;
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Utc;
use koel_app::seeders::{ADMIN_EMAIL, ADMIN_NAME, ADMIN_PASSWORD};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::driver::{Driver, RemoteDriver, ENTER};
use crate::error::{E2eError, E2eResult};
use crate::wait::Waiter;

pub const LOGIN_EMAIL_INPUT: &str = "#app > div.login-wrapper > form > [type='email']";
pub const LOGIN_PASSWORD_INPUT: &str = "#app > div.login-wrapper > form > [type='password']";
pub const USER_BADGE_NAME: &str = "#userBadge > a.view-profile.control > span";
pub const APP_CONTAINER: &str = "#app";

/// Credentials of the seeded admin account
pub const DEFAULT_USERNAME: &str = ADMIN_EMAIL;
pub const DEFAULT_PASSWORD: &str = ADMIN_PASSWORD;

/// DOM id (with leading `#`) of a screen's top-level wrapper
pub fn wrapper_id(screen: &str) -> String {
    format!("#{}Wrapper", screen)
}

/// Sidebar link that opens a screen. Favorites sits in its own container.
pub fn sidebar_link(screen: &str) -> String {
    if screen == "favorites" {
        "#sidebar .favorites a".to_string()
    } else {
        format!("#sidebar a.{}", screen)
    }
}

/// A screenshot written to the artifact directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Screenshot {
    pub path: PathBuf,
    pub sha256: String,
}

/// One browser session against the app under test
pub struct Session<D = RemoteDriver> {
    driver: D,
    base_url: String,
    wrapper_id: Option<String>,
    waiter: Waiter,
}

impl<D: Driver> Session<D> {
    pub fn new(driver: D, base_url: impl Into<String>, waiter: Waiter) -> Self {
        Self {
            driver,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            wrapper_id: None,
            waiter,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Wrapper of the screen last reached through [`Session::goto`]
    pub fn wrapper_id(&self) -> Option<&str> {
        self.wrapper_id.as_deref()
    }

    pub fn waiter(&self) -> Waiter {
        self.waiter
    }

    pub fn driver(&mut self) -> &mut D {
        &mut self.driver
    }

    /// Full navigation to the app root. Clears client-side state, not the database.
    pub async fn open_app(&mut self) -> E2eResult<&mut Self> {
        let url = self.base_url.clone();
        self.driver.navigate(&url).await?;
        self.wrapper_id = None;
        Ok(self)
    }

    /// Navigate to a path under the app's base URL
    pub async fn visit(&mut self, path: &str) -> E2eResult<&mut Self> {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        self.driver.navigate(&url).await?;
        Ok(self)
    }

    pub async fn click(&mut self, selector: &str) -> E2eResult<&mut Self> {
        self.driver.click(selector).await?;
        Ok(self)
    }

    pub async fn type_in(&mut self, selector: &str, text: &str) -> E2eResult<&mut Self> {
        self.driver.type_in(selector, text).await?;
        Ok(self)
    }

    /// Press Enter on the focused element
    pub async fn enter(&mut self) -> E2eResult<&mut Self> {
        self.driver.send_keys(ENTER).await?;
        Ok(self)
    }

    /// Whether `selector` matches anything right now (no waiting)
    pub async fn see(&mut self, selector: &str) -> E2eResult<bool> {
        self.driver.is_present(selector).await
    }

    pub async fn text(&mut self, selector: &str) -> E2eResult<Option<String>> {
        self.driver.text_of(selector).await
    }

    pub async fn value(&mut self, selector: &str) -> E2eResult<Option<String>> {
        self.driver.value_of(selector).await
    }

    pub async fn wait_until_seen(&mut self, selector: &str) -> E2eResult<&mut Self> {
        self.waiter.until_seen(&mut self.driver, selector).await?;
        Ok(self)
    }

    pub async fn wait_until_gone(&mut self, selector: &str) -> E2eResult<&mut Self> {
        self.waiter.until_gone(&mut self.driver, selector).await?;
        Ok(self)
    }

    pub async fn wait_until_text_seen_in(
        &mut self,
        text: &str,
        selector: &str,
    ) -> E2eResult<&mut Self> {
        self.waiter
            .until_text_seen_in(&mut self.driver, text, selector)
            .await?;
        Ok(self)
    }

    /// Log in as the seeded admin
    pub async fn login(&mut self) -> E2eResult<&mut Self> {
        self.login_as(DEFAULT_USERNAME, DEFAULT_PASSWORD).await
    }

    /// Fill the login form and submit it with Enter
    pub async fn login_as(&mut self, username: &str, password: &str) -> E2eResult<&mut Self> {
        info!("Logging in as {}", username);
        self.type_in(LOGIN_EMAIL_INPUT, username).await?;
        self.type_in(LOGIN_PASSWORD_INPUT, password).await?;
        self.enter().await
    }

    /// Log in and block until the user badge shows the admin's name
    pub async fn login_and_wait(&mut self) -> E2eResult<&mut Self> {
        self.login().await?;
        self.wait_until_text_seen_in(ADMIN_NAME, USER_BADGE_NAME)
            .await
    }

    /// Open a screen from the sidebar and wait for its wrapper
    pub async fn goto(&mut self, screen: &str) -> E2eResult<&mut Self> {
        let wrapper = wrapper_id(screen);
        let link = sidebar_link(screen);
        debug!("goto {}: click {}, wait for {}", screen, link, wrapper);

        self.click(&link).await?;
        self.wait_until_seen(&wrapper).await?;
        self.wrapper_id = Some(wrapper);
        Ok(self)
    }

    pub async fn login_and_go_to(&mut self, screen: &str) -> E2eResult<&mut Self> {
        self.login_and_wait().await?;
        self.goto(screen).await
    }

    /// Give the app (not the browser chrome) keyboard focus
    pub async fn focus_into_app(&mut self) -> E2eResult<&mut Self> {
        self.click(APP_CONTAINER).await
    }

    /// Pause until a line arrives on stdin. For poking at a live browser
    /// while debugging a test locally; never leave it in a committed test.
    pub async fn wait_for_user_input(&mut self) -> E2eResult<&mut Self> {
        info!("Paused; press Enter to continue");
        tokio::task::spawn_blocking(|| {
            let mut line = String::new();
            std::io::stdin().read_line(&mut line).map(|_| ())
        })
        .await
        .map_err(|e| E2eError::Io(std::io::Error::other(e)))??;
        Ok(self)
    }

    /// Sleep without polling anything
    pub async fn pause(&mut self, duration: Duration) -> E2eResult<&mut Self> {
        tokio::time::sleep(duration).await;
        Ok(self)
    }

    /// Save a PNG of the viewport as `<name>-<timestamp>.png` under `dir`
    pub async fn screenshot(&mut self, dir: &Path, name: &str) -> E2eResult<Screenshot> {
        let png = self.driver.screenshot().await?;
        std::fs::create_dir_all(dir)?;

        let file = format!(
            "{}-{}.png",
            sanitize(name),
            Utc::now().format("%Y%m%d-%H%M%S%.3f")
        );
        let path = dir.join(file);
        std::fs::write(&path, &png)?;

        let sha256 = hex::encode(Sha256::digest(&png));
        info!("Screenshot saved to {}", path.display());
        Ok(Screenshot { path, sha256 })
    }

    /// End the browser session
    pub async fn quit(&mut self) -> E2eResult<()> {
        self.wrapper_id = None;
        self.driver.quit().await
    }
}

impl<D> std::fmt::Debug for Session<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("base_url", &self.base_url)
            .field("wrapper_id", &self.wrapper_id)
            .field("waiter", &self.waiter)
            .finish_non_exhaustive()
    }
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '-' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::fake::FakeDriver;
    use test_case::test_case;

    const SCREENS: &[&str] = &["home", "queue", "songs", "albums", "artists", "favorites", "settings"];

    /// Logged-out Koel page: login form plus sidebar, each link revealing its wrapper
    fn koel_page() -> FakeDriver {
        let mut page = FakeDriver::default()
            .with_element(APP_CONTAINER, "")
            .with_element(LOGIN_EMAIL_INPUT, "")
            .with_element(LOGIN_PASSWORD_INPUT, "")
            .on_clear("keys", LOGIN_PASSWORD_INPUT)
            .on_hide("keys", LOGIN_PASSWORD_INPUT);
        for screen in SCREENS {
            let link = sidebar_link(screen);
            page = page
                .with_element(&link, "")
                .on_show(&format!("click:{}", link), &wrapper_id(screen), "");
        }
        page
    }

    fn session(driver: FakeDriver) -> Session<FakeDriver> {
        Session::new(
            driver,
            "http://localhost:8081/",
            Waiter::new(Duration::from_millis(80), Duration::from_millis(5)),
        )
    }

    #[test_case("queue", "#sidebar a.queue", "#queueWrapper")]
    #[test_case("songs", "#sidebar a.songs", "#songsWrapper")]
    #[test_case("favorites", "#sidebar .favorites a", "#favoritesWrapper")]
    fn test_screen_selectors(screen: &str, link: &str, wrapper: &str) {
        assert_eq!(sidebar_link(screen), link);
        assert_eq!(wrapper_id(screen), wrapper);
    }

    #[tokio::test]
    async fn test_open_app_navigates_to_base_url() {
        let mut s = session(koel_page());
        s.open_app().await.unwrap();
        assert_eq!(s.driver().log, vec!["navigate:http://localhost:8081"]);

        s.visit("/#!/queue").await.unwrap();
        assert_eq!(s.driver().log[1], "navigate:http://localhost:8081/#!/queue");
    }

    #[tokio::test]
    async fn test_goto_favorites_uses_favorites_container() {
        let mut s = session(koel_page().with_element("#sidebar a.favorites", ""));

        s.goto("favorites").await.unwrap();

        assert_eq!(s.driver().clicks(), vec!["#sidebar .favorites a"]);
        assert_eq!(s.wrapper_id(), Some("#favoritesWrapper"));
        assert!(s.see("#favoritesWrapper").await.unwrap());
    }

    #[test_case("queue")]
    #[test_case("albums")]
    #[test_case("settings")]
    #[tokio::test]
    async fn test_goto_generic_screen(screen: &str) {
        let mut s = session(koel_page());

        s.goto(screen).await.unwrap();

        assert_eq!(s.driver().clicks(), vec![format!("#sidebar a.{}", screen).as_str()]);
        assert_eq!(s.wrapper_id(), Some(wrapper_id(screen).as_str()));
    }

    #[tokio::test]
    async fn test_goto_timeout_keeps_previous_wrapper() {
        let page = koel_page().with_element("#sidebar a.broken", "");
        let mut s = session(page);
        s.goto("queue").await.unwrap();

        let err = s.goto("broken").await.unwrap_err();

        match err {
            E2eError::Timeout { selector, .. } => assert_eq!(selector, "#brokenWrapper"),
            other => panic!("expected timeout, got {other:?}"),
        }
        assert_eq!(s.wrapper_id(), Some("#queueWrapper"));
    }

    #[tokio::test]
    async fn test_goto_missing_link_is_not_found() {
        let mut s = session(koel_page());
        let err = s.goto("radio").await.unwrap_err();
        assert!(matches!(err, E2eError::ElementNotFound { ref selector } if selector == "#sidebar a.radio"));
    }

    #[tokio::test]
    async fn test_login_types_credentials_and_submits() {
        let mut s = session(koel_page());

        s.login().await.unwrap();

        let log = &s.driver().log;
        assert_eq!(log[0], format!("type:{}:koel@example.com", LOGIN_EMAIL_INPUT));
        assert_eq!(log[1], format!("type:{}:SoSecureK0el", LOGIN_PASSWORD_INPUT));
        assert!(log[2].starts_with("keys:"));
        assert_ne!(
            s.value(LOGIN_PASSWORD_INPUT).await.unwrap().as_deref(),
            Some(DEFAULT_PASSWORD)
        );
    }

    #[tokio::test]
    async fn test_login_as_custom_credentials() {
        let mut s = session(koel_page());
        s.login_as("alice@example.com", "hunter2").await.unwrap();
        assert!(s.driver().log[0].ends_with(":alice@example.com"));
        assert!(s.driver().log[1].ends_with(":hunter2"));
    }

    #[tokio::test]
    async fn test_login_and_wait_blocks_until_badge() {
        let page = koel_page().appears_after(USER_BADGE_NAME, "Koel Admin", 4);
        let mut s = session(page);

        s.login_and_wait().await.unwrap();

        assert!(s.driver().polls >= 5);
        assert_eq!(
            s.text(USER_BADGE_NAME).await.unwrap().as_deref(),
            Some("Koel Admin")
        );
    }

    #[tokio::test]
    async fn test_login_and_wait_fails_for_wrong_user() {
        let page = koel_page().on_show("keys", USER_BADGE_NAME, "Someone Else");
        let mut s = session(page);

        let err = s.login_and_wait().await.unwrap_err();
        assert!(err.is_timeout());
    }

    #[tokio::test]
    async fn test_login_and_go_to_favorites() {
        let page = koel_page().on_show("keys", USER_BADGE_NAME, "Koel Admin");
        let mut s = session(page);

        s.login_and_go_to("favorites").await.unwrap();

        assert!(s.see("#favoritesWrapper").await.unwrap());
        assert_eq!(s.wrapper_id(), Some("#favoritesWrapper"));
    }

    #[tokio::test]
    async fn test_chained_shortcuts() {
        let page = koel_page().on_show("keys", USER_BADGE_NAME, "Koel Admin");
        let mut s = session(page);

        s.login_and_wait()
            .await
            .unwrap()
            .goto("queue")
            .await
            .unwrap()
            .focus_into_app()
            .await
            .unwrap();

        assert_eq!(s.driver().clicks(), vec!["#sidebar a.queue", "#app"]);
    }

    #[tokio::test]
    async fn test_screenshot_written_with_digest() {
        let tmp = tempfile::tempdir().unwrap();
        let mut s = session(koel_page());

        let shot = s.screenshot(tmp.path(), "login flow/1").await.unwrap();

        assert!(shot.path.starts_with(tmp.path()));
        assert!(shot
            .path
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("login-flow-1-"));
        assert_eq!(shot.sha256.len(), 64);
    }

    #[tokio::test]
    async fn test_debug_shows_current_screen() {
        let mut s = session(koel_page());
        s.goto("queue").await.unwrap();

        let shown = format!("{:?}", s);
        assert!(shown.contains("http://localhost:8081"));
        assert!(shown.contains("#queueWrapper"));
    }

    #[tokio::test]
    async fn test_quit_twice_is_an_error() {
        let mut s = session(koel_page());
        s.quit().await.unwrap();
        assert!(s.driver().is_closed());
        assert!(matches!(s.quit().await, Err(E2eError::SessionClosed)));
    }
}
