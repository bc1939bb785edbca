//! Page access: the [`Page`] seam, the polling [`Driver`] on top of it, and
//! an in-memory page for demos and tests.

mod driver;
mod memory;
mod page;

pub use driver::{Driver, PollOptions};
pub use memory::{Effect, MemoryPage, NodeFixture, PageFixture, ScrollStep};
pub use page::{DomEvent, ElementId, ElementInfo, ElementKind, Page, PageError, SelectOption};
