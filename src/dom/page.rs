//! The browsing-context seam.
//!
//! A [`Page`] is whatever the host injects the engine into: a CDP session,
//! a WebDriver window, or the in-memory [`MemoryPage`](super::MemoryPage).
//! It exposes raw DOM operations only; waiting, retrying and fallback
//! handling live in the [`Driver`](super::Driver).

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Opaque handle to an element on the current page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ElementId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    TextInput,
    TextArea,
    Select,
    Checkbox,
    Button,
    Link,
    Container,
    Text,
}

impl ElementKind {
    pub fn accepts_text(self) -> bool {
        matches!(self, ElementKind::TextInput | ElementKind::TextArea)
    }
}

/// Synthetic events fired after a programmatic value change so that the
/// page's reactive listeners observe it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DomEvent {
    Input,
    Change,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    pub value: String,
    pub text: String,
}

/// Snapshot of the element properties the engine reads.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ElementInfo {
    pub kind: Option<ElementKind>,
    pub text: String,
    pub value: String,
    /// Text of the first associated `<label>`.
    pub label: Option<String>,
    pub placeholder: Option<String>,
    pub href: Option<String>,
    pub checked: bool,
    pub options: Vec<SelectOption>,
}

impl ElementInfo {
    /// The question text shown for a form field: its label, else its placeholder.
    pub fn question_text(&self) -> Option<String> {
        self.label
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .or_else(|| {
                self.placeholder
                    .as_deref()
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
            })
            .map(str::to_string)
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PageError {
    #[error("element {0:?} is detached from the document")]
    Detached(ElementId),

    #[error("invalid selector: {0}")]
    InvalidSelector(String),

    #[error("navigation failed: {0}")]
    Navigation(String),

    #[error("page unavailable: {0}")]
    Unavailable(String),
}

/// Raw DOM access for one browsing context.
#[allow(async_fn_in_trait)]
pub trait Page {
    async fn current_url(&self) -> Result<String, PageError>;

    async fn navigate(&self, url: &str) -> Result<(), PageError>;

    /// All attached, visible elements matching `selector`, in document order.
    /// With a `scope`, only descendants of that element are considered.
    async fn query_all(
        &self,
        scope: Option<ElementId>,
        selector: &str,
    ) -> Result<Vec<ElementId>, PageError>;

    async fn describe(&self, element: ElementId) -> Result<ElementInfo, PageError>;

    /// Assign the element's value property. Fires no events on its own.
    async fn set_value(&self, element: ElementId, value: &str) -> Result<(), PageError>;

    async fn dispatch_event(&self, element: ElementId, event: DomEvent) -> Result<(), PageError>;

    async fn scroll_into_view(&self, element: ElementId) -> Result<(), PageError>;

    async fn click(&self, element: ElementId) -> Result<(), PageError>;

    async fn scroll_height(&self, element: ElementId) -> Result<u64, PageError>;

    async fn scroll_to_bottom(&self, element: ElementId) -> Result<(), PageError>;
}
