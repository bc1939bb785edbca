//! DOM interaction primitives with bounded polling.
//!
//! Every primitive takes an ordered list of candidate locators and shares one
//! contract: try each candidate in order, once per interval, until one
//! matches or the timeout elapses. A timeout yields a not-found value
//! (`None`/`false`), never an error. Page errors are logged and treated as
//! "no match" for that attempt.

use std::time::Duration;

use tokio::time::{Instant, sleep};
use tracing::{debug, warn};

use super::page::{DomEvent, ElementId, ElementInfo, ElementKind, Page, PageError};

/// Timeout and interval for one polling primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollOptions {
    pub timeout: Duration,
    pub interval: Duration,
}

impl PollOptions {
    pub fn new(timeout_ms: u64, interval_ms: u64) -> Self {
        Self {
            timeout: Duration::from_millis(timeout_ms),
            interval: Duration::from_millis(interval_ms),
        }
    }
}

impl Default for PollOptions {
    fn default() -> Self {
        Self::new(10_000, 500)
    }
}

/// Polling primitives over a [`Page`].
pub struct Driver<P> {
    page: P,
    click_settle: Duration,
}

impl<P: Page> Driver<P> {
    pub fn new(page: P) -> Self {
        Self {
            page,
            click_settle: Duration::from_millis(200),
        }
    }

    pub fn with_click_settle(mut self, settle: Duration) -> Self {
        self.click_settle = settle;
        self
    }

    pub fn page(&self) -> &P {
        &self.page
    }

    /// First element matched by the earliest candidate, polling until `poll.timeout`.
    ///
    /// All candidates are attempted at least once, even with a zero timeout.
    pub async fn find(&self, locators: &[String], poll: PollOptions) -> Option<ElementId> {
        let deadline = Instant::now() + poll.timeout;
        loop {
            if let Some(found) = self.find_now(None, locators).await {
                return Some(found);
            }
            if Instant::now() >= deadline {
                break;
            }
            sleep(poll.interval).await;
        }
        debug!(?locators, timeout_ms = poll.timeout.as_millis() as u64, "element not found within timeout");
        None
    }

    /// One sweep over the candidates, optionally scoped to a parent element.
    pub async fn find_now(&self, scope: Option<ElementId>, locators: &[String]) -> Option<ElementId> {
        for locator in locators {
            match self.page.query_all(scope, locator).await {
                Ok(found) => {
                    if let Some(first) = found.first() {
                        debug!(locator = %locator, "found element");
                        return Some(*first);
                    }
                }
                Err(e) => warn!(locator = %locator, error = %e, "query failed"),
            }
        }
        None
    }

    /// Every element matched by any candidate, deduplicated, in candidate order.
    pub async fn find_all(&self, scope: Option<ElementId>, locators: &[String]) -> Vec<ElementId> {
        let mut all = Vec::new();
        for locator in locators {
            match self.page.query_all(scope, locator).await {
                Ok(found) => {
                    for el in found {
                        if !all.contains(&el) {
                            all.push(el);
                        }
                    }
                }
                Err(e) => warn!(locator = %locator, error = %e, "query failed"),
            }
        }
        all
    }

    pub async fn describe(&self, element: ElementId) -> Option<ElementInfo> {
        match self.page.describe(element).await {
            Ok(info) => Some(info),
            Err(e) => {
                warn!(?element, error = %e, "could not read element");
                None
            }
        }
    }

    /// Find, scroll into view and click. Returns whether the click was dispatched.
    pub async fn click(&self, locators: &[String], poll: PollOptions) -> bool {
        match self.find(locators, poll).await {
            Some(element) => self.click_element(element).await,
            None => {
                warn!(?locators, "failed to click: element not found");
                false
            }
        }
    }

    pub async fn click_element(&self, element: ElementId) -> bool {
        if let Err(e) = self.page.scroll_into_view(element).await {
            warn!(?element, error = %e, "scroll into view failed");
            return false;
        }
        sleep(self.click_settle).await;
        match self.page.click(element).await {
            Ok(()) => {
                debug!(?element, "clicked element");
                true
            }
            Err(e) => {
                warn!(?element, error = %e, "click failed");
                false
            }
        }
    }

    /// Find a text field and set its value, firing `input` and `change`.
    pub async fn type_into(&self, locators: &[String], text: &str, poll: PollOptions) -> bool {
        match self.find(locators, poll).await {
            Some(element) => self.type_into_element(element, text).await,
            None => {
                warn!(?locators, "failed to type: element not found");
                false
            }
        }
    }

    pub async fn type_into_element(&self, element: ElementId, text: &str) -> bool {
        let Some(info) = self.describe(element).await else {
            return false;
        };
        if !info.kind.is_some_and(|k| k.accepts_text()) {
            warn!(?element, kind = ?info.kind, "element does not accept text input");
            return false;
        }
        // Without the events the page's reactive framework never sees the value.
        let result = self
            .assign_value(element, text, &[DomEvent::Input, DomEvent::Change])
            .await;
        match result {
            Ok(()) => {
                debug!(?element, chars = text.chars().count(), "typed into element");
                true
            }
            Err(e) => {
                warn!(?element, error = %e, "typing failed");
                false
            }
        }
    }

    /// Find a select control and pick the option whose value or display text equals `value`.
    pub async fn select_option(&self, locators: &[String], value: &str, poll: PollOptions) -> bool {
        let Some(element) = self.find(locators, poll).await else {
            warn!(?locators, "failed to select: element not found");
            return false;
        };
        let Some(info) = self.describe(element).await else {
            return false;
        };
        if info.kind != Some(ElementKind::Select) {
            warn!(?element, kind = ?info.kind, "element is not a select control");
            return false;
        }
        let Some(option) = info
            .options
            .iter()
            .find(|opt| opt.value == value || opt.text == value)
        else {
            warn!(?element, value, "option not found");
            return false;
        };
        let result = self
            .assign_value(element, &option.value, &[DomEvent::Change])
            .await;
        match result {
            Ok(()) => {
                debug!(?element, value = %option.value, "selected option");
                true
            }
            Err(e) => {
                warn!(?element, error = %e, "select failed");
                false
            }
        }
    }

    async fn assign_value(
        &self,
        element: ElementId,
        value: &str,
        events: &[DomEvent],
    ) -> Result<(), PageError> {
        self.page.set_value(element, value).await?;
        for event in events {
            self.page.dispatch_event(element, *event).await?;
        }
        Ok(())
    }

    /// Trimmed text content of the first match.
    pub async fn get_text(&self, locators: &[String], poll: PollOptions) -> Option<String> {
        let element = self.find(locators, poll).await?;
        self.describe(element).await.map(|info| info.text.trim().to_string())
    }

    pub async fn exists(&self, locators: &[String], poll: PollOptions) -> bool {
        self.find(locators, poll).await.is_some()
    }

    pub async fn scroll_height(&self, element: ElementId) -> Option<u64> {
        match self.page.scroll_height(element).await {
            Ok(height) => Some(height),
            Err(e) => {
                warn!(?element, error = %e, "could not read scroll height");
                None
            }
        }
    }

    pub async fn scroll_to_bottom(&self, element: ElementId) -> bool {
        match self.page.scroll_to_bottom(element).await {
            Ok(()) => true,
            Err(e) => {
                warn!(?element, error = %e, "scroll failed");
                false
            }
        }
    }
}
