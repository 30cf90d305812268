//! WebDriver seam
//!
//! [`Driver`] is the handful of remote-control verbs the harness needs.
//! [`RemoteDriver`] implements it over a fantoccini session; the shortcut
//! library and waits only ever see the trait.

use async_trait::async_trait;
use fantoccini::elements::Element;
use fantoccini::error::CmdError;
use fantoccini::wd::Capabilities;
use fantoccini::{Client, ClientBuilder, Locator};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

use crate::error::{E2eError, E2eResult};

/// WebDriver code point for the Enter key
pub const ENTER: &str = "\u{E007}";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Browser {
    #[default]
    Chrome,
    Firefox,
    Edge,
}

impl Browser {
    pub fn as_str(&self) -> &'static str {
        match self {
            Browser::Chrome => "chrome",
            Browser::Firefox => "firefox",
            Browser::Edge => "MicrosoftEdge",
        }
    }

    /// Capabilities sent with the new-session request
    pub fn capabilities(&self, headless: bool) -> Capabilities {
        let mut caps = Capabilities::new();
        caps.insert("browserName".to_string(), json!(self.as_str()));

        if headless {
            match self {
                Browser::Chrome => {
                    caps.insert(
                        "goog:chromeOptions".to_string(),
                        json!({ "args": ["--headless=new", "--disable-gpu", "--window-size=1280,720"] }),
                    );
                }
                Browser::Edge => {
                    caps.insert(
                        "ms:edgeOptions".to_string(),
                        json!({ "args": ["--headless=new", "--window-size=1280,720"] }),
                    );
                }
                Browser::Firefox => {
                    caps.insert(
                        "moz:firefoxOptions".to_string(),
                        json!({ "args": ["-headless"] }),
                    );
                }
            }
        }

        caps
    }
}

impl std::str::FromStr for Browser {
    type Err = E2eError;

    fn from_str(s: &str) -> E2eResult<Self> {
        match s.to_ascii_lowercase().as_str() {
            "chrome" | "chromium" => Ok(Browser::Chrome),
            "firefox" => Ok(Browser::Firefox),
            "edge" | "microsoftedge" => Ok(Browser::Edge),
            other => Err(E2eError::Config(format!("unknown browser: {}", other))),
        }
    }
}

/// Remote-control verbs used by the harness. Selectors are CSS.
#[async_trait]
pub trait Driver: Send {
    async fn navigate(&mut self, url: &str) -> E2eResult<()>;

    async fn click(&mut self, selector: &str) -> E2eResult<()>;

    /// Send keystrokes to the element matching `selector`
    async fn type_in(&mut self, selector: &str, text: &str) -> E2eResult<()>;

    /// Send keystrokes to whatever element has focus
    async fn send_keys(&mut self, keys: &str) -> E2eResult<()>;

    /// Whether at least one element matches `selector` right now
    async fn is_present(&mut self, selector: &str) -> E2eResult<bool>;

    /// Visible text of the first match, `None` if nothing matches
    async fn text_of(&mut self, selector: &str) -> E2eResult<Option<String>>;

    /// Current `value` property of the first match
    async fn value_of(&mut self, selector: &str) -> E2eResult<Option<String>>;

    /// PNG screenshot of the viewport
    async fn screenshot(&mut self) -> E2eResult<Vec<u8>>;

    /// End the remote session. Calling it twice is an error.
    async fn quit(&mut self) -> E2eResult<()>;
}

/// [`Driver`] over a fantoccini WebDriver session
pub struct RemoteDriver {
    client: Option<Client>,
}

impl RemoteDriver {
    /// Open a session on the WebDriver endpoint
    pub async fn connect(webdriver_url: &str, browser: Browser, headless: bool) -> E2eResult<Self> {
        info!("Opening {} session on {}", browser.as_str(), webdriver_url);

        let mut builder = ClientBuilder::native();
        builder.capabilities(browser.capabilities(headless));
        let client = builder.connect(webdriver_url).await?;

        Ok(Self {
            client: Some(client),
        })
    }

    fn client(&self) -> E2eResult<&Client> {
        self.client.as_ref().ok_or(E2eError::SessionClosed)
    }

    async fn find(&self, selector: &str) -> E2eResult<Element> {
        self.client()?
            .find(Locator::Css(selector))
            .await
            .map_err(|e| lookup_error(selector, e))
    }

    async fn first(&self, selector: &str) -> E2eResult<Option<Element>> {
        let mut found = self.client()?.find_all(Locator::Css(selector)).await?;
        if found.is_empty() {
            Ok(None)
        } else {
            Ok(Some(found.swap_remove(0)))
        }
    }
}

/// A failed lookup: a missing element names its selector, anything else stays a WebDriver error
fn lookup_error(selector: &str, e: CmdError) -> E2eError {
    if e.is_no_such_element() {
        E2eError::ElementNotFound {
            selector: selector.to_string(),
        }
    } else {
        E2eError::WebDriver(e)
    }
}

#[async_trait]
impl Driver for RemoteDriver {
    async fn navigate(&mut self, url: &str) -> E2eResult<()> {
        debug!("navigate: {}", url);
        self.client()?.goto(url).await?;
        Ok(())
    }

    async fn click(&mut self, selector: &str) -> E2eResult<()> {
        debug!("click: {}", selector);
        self.find(selector).await?.click().await?;
        Ok(())
    }

    async fn type_in(&mut self, selector: &str, text: &str) -> E2eResult<()> {
        debug!("type: {}", selector);
        self.find(selector).await?.send_keys(text).await?;
        Ok(())
    }

    async fn send_keys(&mut self, keys: &str) -> E2eResult<()> {
        self.client()?.active_element().await?.send_keys(keys).await?;
        Ok(())
    }

    async fn is_present(&mut self, selector: &str) -> E2eResult<bool> {
        Ok(self.first(selector).await?.is_some())
    }

    async fn text_of(&mut self, selector: &str) -> E2eResult<Option<String>> {
        match self.first(selector).await? {
            Some(el) => Ok(Some(el.text().await?)),
            None => Ok(None),
        }
    }

    async fn value_of(&mut self, selector: &str) -> E2eResult<Option<String>> {
        match self.first(selector).await? {
            Some(el) => Ok(el.prop("value").await?),
            None => Ok(None),
        }
    }

    async fn screenshot(&mut self) -> E2eResult<Vec<u8>> {
        Ok(self.client()?.screenshot().await?)
    }

    async fn quit(&mut self) -> E2eResult<()> {
        let client = self.client.take().ok_or(E2eError::SessionClosed)?;
        client.close().await?;
        info!("Browser session closed");
        Ok(())
    }
}
