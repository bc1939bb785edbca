//! Job Scan & Dedup Loop.
//!
//! One scan scrolls the listing a bounded number of times, then walks the
//! listing entries in document order and picks the first actionable one
//! whose link has not been claimed yet. When nothing qualifies, one more
//! scroll is tried; growth earns another pass, no growth means the listing
//! is exhausted. A page that lazy-loads slower than the scroll wait is
//! reported as exhausted too.

use std::collections::HashSet;

use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::{LimitsConfig, TimingConfig};
use crate::dom::{Driver, ElementId, Page};
use crate::selectors::{SelectorResolver, names};
use crate::state_machine::Job;

#[derive(Debug)]
pub enum ScanResult {
    /// An actionable entry; `link` opens its detail view.
    Found { job: Job, link: ElementId },
    Exhausted,
}

pub struct Scanner<'a, P> {
    driver: &'a Driver<P>,
    resolver: &'a SelectorResolver,
    timing: &'a TimingConfig,
    limits: &'a LimitsConfig,
}

impl<'a, P: Page> Scanner<'a, P> {
    pub fn new(
        driver: &'a Driver<P>,
        resolver: &'a SelectorResolver,
        timing: &'a TimingConfig,
        limits: &'a LimitsConfig,
    ) -> Self {
        Self {
            driver,
            resolver,
            timing,
            limits,
        }
    }

    pub async fn scan(&self, claimed: &HashSet<String>) -> ScanResult {
        self.auto_scroll(self.limits.scroll_cycles).await;
        for pass in 0..self.limits.scan_passes.max(1) {
            if let Some(found) = self.first_candidate(claimed).await {
                return found;
            }
            debug!(pass, "no unclaimed actionable entry, trying one more scroll");
            if !self.auto_scroll(1).await {
                break;
            }
        }
        info!("listing exhausted");
        ScanResult::Exhausted
    }

    /// Scroll the listing container up to `cycles` times, stopping at the
    /// first scroll that does not grow the content. Returns whether any grew.
    pub async fn auto_scroll(&self, cycles: u32) -> bool {
        let locators = self.resolver.resolve(names::LISTING_CONTAINER);
        let Some(container) = self.driver.find(&locators, self.timing.probe()).await else {
            warn!("listing container not found");
            return false;
        };

        let mut grew = false;
        for _ in 0..cycles {
            let Some(before) = self.driver.scroll_height(container).await else {
                break;
            };
            if !self.driver.scroll_to_bottom(container).await {
                break;
            }
            sleep(self.timing.scroll_wait()).await;
            let after = self.driver.scroll_height(container).await.unwrap_or(before);
            if after > before {
                debug!(before, after, "listing grew");
                grew = true;
            } else {
                debug!(height = after, "no new content after scrolling");
                break;
            }
        }
        grew
    }

    async fn first_candidate(&self, claimed: &HashSet<String>) -> Option<ScanResult> {
        let items = self
            .driver
            .find_all(None, &self.resolver.resolve(names::LISTING_ITEM))
            .await;
        debug!(count = items.len(), "enumerated listing entries");

        for item in items {
            let Some((job, link)) = self.candidate(item).await else {
                continue;
            };
            if claimed.contains(&job.source_url) {
                debug!(url = %job.source_url, "skipping claimed entry");
                continue;
            }
            info!(title = %job.title, company = %job.company, "found actionable job");
            return Some(ScanResult::Found { job, link });
        }
        None
    }

    /// An entry qualifies when it exposes the action control, a title link
    /// with an href, and a company element.
    async fn candidate(&self, item: ElementId) -> Option<(Job, ElementId)> {
        self.find_in(item, names::LISTING_ACTION).await?;
        let link = self.find_in(item, names::LISTING_TITLE).await?;
        let company = self.find_in(item, names::LISTING_COMPANY).await?;

        let title_info = self.driver.describe(link).await?;
        let href = title_info.href.filter(|h| !h.trim().is_empty())?;
        let company_info = self.driver.describe(company).await?;

        let job = Job::new(
            title_info.text.trim().to_string(),
            company_info.text.trim().to_string(),
            href,
        );
        Some((job, link))
    }

    async fn find_in(&self, item: ElementId, name: &str) -> Option<ElementId> {
        let locators = self.resolver.resolve(name);
        self.driver.find_now(Some(item), &locators).await
    }
}
