//! In-memory page driven by a JSON fixture.
//!
//! Elements answer to an explicit list of selector strings rather than a
//! CSS engine, which keeps recorded pages deterministic. Clicks can show or
//! hide other elements (form steps, modals), scroll containers can grow in
//! scripted increments, and the page tracks the value its reactive
//! framework has *observed* separately from the raw DOM value: only an
//! `input`/`change` event propagates one to the other.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use serde::Deserialize;

use super::page::{DomEvent, ElementId, ElementInfo, ElementKind, Page, PageError, SelectOption};
use crate::error::EngineError;

/// Serialized page: a URL and a flat, document-ordered element list.
#[derive(Debug, Clone, Deserialize)]
pub struct PageFixture {
    pub url: String,
    #[serde(default)]
    pub elements: Vec<NodeFixture>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NodeFixture {
    pub id: String,
    pub kind: ElementKind,
    #[serde(default)]
    pub selectors: Vec<String>,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub placeholder: Option<String>,
    #[serde(default)]
    pub href: Option<String>,
    #[serde(default)]
    pub checked: bool,
    #[serde(default)]
    pub options: Vec<SelectOption>,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub on_click: Vec<Effect>,
    #[serde(default)]
    pub scroll_height: u64,
    #[serde(default)]
    pub scroll_steps: Vec<ScrollStep>,
}

/// Side effect of clicking an element. Targets name an element id or a group.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Effect {
    Show(Vec<String>),
    Hide(Vec<String>),
    Navigate(String),
}

/// One scripted scroll: content grows by `grow` and `show` targets appear.
#[derive(Debug, Clone, Deserialize)]
pub struct ScrollStep {
    pub grow: u64,
    #[serde(default)]
    pub show: Vec<String>,
}

#[derive(Debug)]
struct Node {
    id: ElementId,
    parent: Option<ElementId>,
    fixture: NodeFixture,
    observed: String,
    events: Vec<DomEvent>,
    clicks: u32,
    next_scroll: usize,
}

#[derive(Debug)]
struct Dom {
    url: String,
    nodes: Vec<Node>,
    navigations: Vec<String>,
}

impl Dom {
    fn node(&self, id: ElementId) -> Option<&Node> {
        self.nodes.get(id.0 as usize)
    }

    fn node_mut(&mut self, id: ElementId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0 as usize)
    }

    fn by_name(&self, name: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.fixture.id == name)
    }

    fn is_visible(&self, id: ElementId) -> bool {
        let mut current = self.node(id);
        while let Some(node) = current {
            if node.fixture.hidden {
                return false;
            }
            current = node.parent.and_then(|p| self.node(p));
        }
        true
    }

    fn is_descendant(&self, id: ElementId, ancestor: ElementId) -> bool {
        let mut current = self.node(id).and_then(|n| n.parent);
        while let Some(parent) = current {
            if parent == ancestor {
                return true;
            }
            current = self.node(parent).and_then(|n| n.parent);
        }
        false
    }

    fn attached(&self, id: ElementId) -> Result<&Node, PageError> {
        match self.node(id) {
            Some(node) if self.is_visible(id) => Ok(node),
            _ => Err(PageError::Detached(id)),
        }
    }

    fn set_hidden(&mut self, targets: &[String], hidden: bool) {
        for node in &mut self.nodes {
            let hit = targets
                .iter()
                .any(|t| node.fixture.id == *t || node.fixture.group.as_deref() == Some(t.as_str()));
            if hit {
                node.fixture.hidden = hidden;
            }
        }
    }

    fn apply(&mut self, effects: &[Effect]) {
        for effect in effects {
            match effect {
                Effect::Show(targets) => self.set_hidden(targets, false),
                Effect::Hide(targets) => self.set_hidden(targets, true),
                Effect::Navigate(url) => {
                    self.url = url.clone();
                    self.navigations.push(url.clone());
                }
            }
        }
    }
}

/// Deterministic [`Page`] used by the CLI demo and the test-suite.
#[derive(Debug)]
pub struct MemoryPage {
    dom: Mutex<Dom>,
}

impl MemoryPage {
    pub fn from_fixture(fixture: PageFixture) -> Result<Self, EngineError> {
        let mut nodes: Vec<Node> = Vec::with_capacity(fixture.elements.len());
        for (index, node) in fixture.elements.into_iter().enumerate() {
            let parent = match &node.parent {
                Some(name) => Some(
                    nodes
                        .iter()
                        .find(|n| n.fixture.id == *name)
                        .map(|n| n.id)
                        .ok_or_else(|| {
                            EngineError::Config(format!(
                                "element {} names unknown or later parent {name}",
                                node.id
                            ))
                        })?,
                ),
                None => None,
            };
            nodes.push(Node {
                id: ElementId(index as u64),
                parent,
                observed: node.value.clone(),
                fixture: node,
                events: Vec::new(),
                clicks: 0,
                next_scroll: 0,
            });
        }
        Ok(Self {
            dom: Mutex::new(Dom {
                url: fixture.url,
                nodes,
                navigations: Vec::new(),
            }),
        })
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self, EngineError> {
        Self::from_fixture(serde_json::from_value(value)?)
    }

    pub fn load(path: &Path) -> Result<Self, EngineError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_fixture(serde_json::from_str(&contents)?)
    }

    /// The recorded listing page bundled with the CLI `demo` command.
    pub fn demo() -> Result<Self, EngineError> {
        Self::from_fixture(serde_json::from_str(include_str!("../../demos/listing_page.json"))?)
    }

    fn lock(&self) -> MutexGuard<'_, Dom> {
        self.dom.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn element_id(&self, name: &str) -> Option<ElementId> {
        self.lock().by_name(name).map(|n| n.id)
    }

    pub fn is_visible(&self, name: &str) -> bool {
        let dom = self.lock();
        dom.by_name(name).is_some_and(|n| dom.is_visible(n.id))
    }

    /// Value as seen by the page's own listeners (updated only by events).
    pub fn observed_value(&self, name: &str) -> Option<String> {
        self.lock().by_name(name).map(|n| n.observed.clone())
    }

    pub fn clicks(&self, name: &str) -> u32 {
        self.lock().by_name(name).map_or(0, |n| n.clicks)
    }

    pub fn is_checked(&self, name: &str) -> bool {
        self.lock().by_name(name).is_some_and(|n| n.fixture.checked)
    }

    pub fn events_for(&self, id: ElementId) -> Vec<DomEvent> {
        self.lock().node(id).map(|n| n.events.clone()).unwrap_or_default()
    }

    pub fn navigations(&self) -> Vec<String> {
        self.lock().navigations.clone()
    }
}

impl Page for MemoryPage {
    async fn current_url(&self) -> Result<String, PageError> {
        Ok(self.lock().url.clone())
    }

    async fn navigate(&self, url: &str) -> Result<(), PageError> {
        if url.trim().is_empty() {
            return Err(PageError::Navigation("empty url".into()));
        }
        let mut dom = self.lock();
        dom.url = url.to_string();
        dom.navigations.push(url.to_string());
        Ok(())
    }

    async fn query_all(
        &self,
        scope: Option<ElementId>,
        selector: &str,
    ) -> Result<Vec<ElementId>, PageError> {
        if selector.trim().is_empty() {
            return Err(PageError::InvalidSelector(selector.to_string()));
        }
        let dom = self.lock();
        Ok(dom
            .nodes
            .iter()
            .filter(|n| n.fixture.selectors.iter().any(|s| s == selector))
            .filter(|n| dom.is_visible(n.id))
            .filter(|n| scope.is_none_or(|root| dom.is_descendant(n.id, root)))
            .map(|n| n.id)
            .collect())
    }

    async fn describe(&self, element: ElementId) -> Result<ElementInfo, PageError> {
        let dom = self.lock();
        let node = dom.attached(element)?;
        let f = &node.fixture;
        Ok(ElementInfo {
            kind: Some(f.kind),
            text: f.text.clone(),
            value: f.value.clone(),
            label: f.label.clone(),
            placeholder: f.placeholder.clone(),
            href: f.href.clone(),
            checked: f.checked,
            options: f.options.clone(),
        })
    }

    async fn set_value(&self, element: ElementId, value: &str) -> Result<(), PageError> {
        let mut dom = self.lock();
        dom.attached(element)?;
        if let Some(node) = dom.node_mut(element) {
            node.fixture.value = value.to_string();
        }
        Ok(())
    }

    async fn dispatch_event(&self, element: ElementId, event: DomEvent) -> Result<(), PageError> {
        let mut dom = self.lock();
        dom.attached(element)?;
        if let Some(node) = dom.node_mut(element) {
            node.events.push(event);
            node.observed = node.fixture.value.clone();
        }
        Ok(())
    }

    async fn scroll_into_view(&self, element: ElementId) -> Result<(), PageError> {
        self.lock().attached(element).map(|_| ())
    }

    async fn click(&self, element: ElementId) -> Result<(), PageError> {
        let mut dom = self.lock();
        dom.attached(element)?;
        let effects = match dom.node_mut(element) {
            Some(node) => {
                node.clicks += 1;
                if node.fixture.kind == ElementKind::Checkbox {
                    node.fixture.checked = !node.fixture.checked;
                }
                node.fixture.on_click.clone()
            }
            None => Vec::new(),
        };
        dom.apply(&effects);
        Ok(())
    }

    async fn scroll_height(&self, element: ElementId) -> Result<u64, PageError> {
        Ok(self.lock().attached(element)?.fixture.scroll_height)
    }

    async fn scroll_to_bottom(&self, element: ElementId) -> Result<(), PageError> {
        let mut dom = self.lock();
        dom.attached(element)?;
        let step = dom.node_mut(element).and_then(|node| {
            let step = node.fixture.scroll_steps.get(node.next_scroll).cloned()?;
            node.next_scroll += 1;
            node.fixture.scroll_height += step.grow;
            Some(step)
        });
        if let Some(step) = step {
            dom.set_hidden(&step.show, false);
        }
        Ok(())
    }
}
