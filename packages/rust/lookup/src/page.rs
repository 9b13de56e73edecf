//! Page-interaction surface and its WebDriver implementation.

use std::time::Duration;

use async_trait::async_trait;
use fantoccini::elements::Element;
use fantoccini::error::CmdError;
use fantoccini::key::Key;
use fantoccini::{Client, Locator};
use tracing::warn;

use crate::error::PageError;
use crate::selectors::Selector;

/// The surface the lookup engine drives.
///
/// Production backs this with a WebDriver session; engine tests script their
/// own implementation.
#[async_trait]
pub trait PageDriver: Send {
    /// Navigate to `url`.
    async fn open(&mut self, url: &str) -> Result<(), PageError>;

    /// True when `selector` matches an element that is currently displayed
    /// and enabled. Lookup misses report as `false`, not as errors.
    async fn probe(&mut self, selector: &Selector) -> bool;

    /// Scroll the element into view, clear it, set `value`, advance focus.
    async fn fill(&mut self, selector: &Selector, value: &str) -> Result<(), PageError>;

    /// Click the element. Dispatched through script, not a pointer event.
    async fn click(&mut self, selector: &Selector) -> Result<(), PageError>;

    /// Wait up to `timeout` for the element, then return its visible text.
    async fn read_text(
        &mut self,
        selector: &Selector,
        timeout: Duration,
    ) -> Result<String, PageError>;
}

// ---------------------------------------------------------------------------
// WebDriverPage
// ---------------------------------------------------------------------------

/// A live browser page owned by exactly one in-flight lookup.
pub struct WebDriverPage {
    client: Client,
}

impl WebDriverPage {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Tear down the browser session. Close failures are logged, never
    /// surfaced; the lookup result is already decided by this point.
    pub async fn close(self) {
        if let Err(e) = self.client.close().await {
            warn!(error = %e, "failed to close browser session");
        }
    }

    async fn find(&self, selector: &Selector) -> Result<Element, CmdError> {
        match selector {
            Selector::Id(id) => self.client.find(Locator::Id(id)).await,
            Selector::Css(css) => self.client.find(Locator::Css(css)).await,
            Selector::XPath(xpath) => self.client.find(Locator::XPath(xpath)).await,
            Selector::Class(name) => {
                let css = format!(".{name}");
                self.client.find(Locator::Css(&css)).await
            }
            Selector::Tag(tag) => self.client.find(Locator::Css(tag)).await,
        }
    }

    async fn wait_for(&self, locator: Locator<'_>, timeout: Duration) -> Result<Element, CmdError> {
        self.client.wait().at_most(timeout).for_element(locator).await
    }
}

#[async_trait]
impl PageDriver for WebDriverPage {
    async fn open(&mut self, url: &str) -> Result<(), PageError> {
        self.client.goto(url).await?;
        Ok(())
    }

    async fn probe(&mut self, selector: &Selector) -> bool {
        match self.find(selector).await {
            Ok(element) => {
                let displayed = element.is_displayed().await.unwrap_or(false);
                let enabled = element.is_enabled().await.unwrap_or(false);
                displayed && enabled
            }
            Err(_) => false,
        }
    }

    async fn fill(&mut self, selector: &Selector, value: &str) -> Result<(), PageError> {
        let element = self.find(selector).await?;
        let handle = serde_json::to_value(&element)?;

        self.client
            .execute("arguments[0].scrollIntoView(true);", vec![handle.clone()])
            .await?;
        element.clear().await?;
        // Set the value through script, then TAB out so the page's own
        // change handlers fire.
        self.client
            .execute(
                "arguments[0].value = arguments[1];",
                vec![handle, serde_json::Value::String(value.to_string())],
            )
            .await?;
        element.send_keys(&String::from(char::from(Key::Tab))).await?;
        Ok(())
    }

    async fn click(&mut self, selector: &Selector) -> Result<(), PageError> {
        let element = self.find(selector).await?;
        let handle = serde_json::to_value(&element)?;
        self.client
            .execute("arguments[0].click();", vec![handle])
            .await?;
        Ok(())
    }

    async fn read_text(
        &mut self,
        selector: &Selector,
        timeout: Duration,
    ) -> Result<String, PageError> {
        let element = match selector {
            Selector::Id(id) => self.wait_for(Locator::Id(id), timeout).await?,
            Selector::Css(css) => self.wait_for(Locator::Css(css), timeout).await?,
            Selector::XPath(xpath) => self.wait_for(Locator::XPath(xpath), timeout).await?,
            Selector::Class(name) => {
                let css = format!(".{name}");
                self.wait_for(Locator::Css(&css), timeout).await?
            }
            Selector::Tag(tag) => self.wait_for(Locator::Css(tag), timeout).await?,
        };
        Ok(element.text().await?)
    }
}
