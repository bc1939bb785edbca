//! Selector Resolver: logical field names → ordered CSS-style locators.
//!
//! The resilience map is user configuration, so a name can map to a single
//! locator or a comma-separated list of fallbacks tried in order. Names
//! missing from the map get a synthetic `[data-automation-id="…"]` locator
//! that usually matches nothing; downstream primitives treat that exactly
//! like an absent field.

use std::collections::BTreeMap;

use tracing::warn;

/// Logical names the engine looks up. Stored maps may override any of them.
pub mod names {
    pub const EASY_APPLY_BUTTON: &str = "easyApplyButton";
    pub const NEXT_BUTTON: &str = "nextButton";
    pub const REVIEW_BUTTON: &str = "reviewButton";
    pub const SUBMIT_BUTTON: &str = "submitButton";
    pub const FOLLOW_COMPANY_CHECKBOX: &str = "followCompanyCheckbox";
    pub const LISTING_CONTAINER: &str = "listingContainer";
    pub const LISTING_ITEM: &str = "listingItem";
    pub const LISTING_ACTION: &str = "listingAction";
    pub const LISTING_TITLE: &str = "listingTitle";
    pub const LISTING_COMPANY: &str = "listingCompany";
    pub const PHONE_FIELD: &str = "phoneField";
    pub const EMAIL_FIELD: &str = "emailField";
    pub const QUESTION_FIELD: &str = "questionField";
    pub const CONTENT_FIELD: &str = "contentField";
    pub const JOB_DESCRIPTION: &str = "jobDescription";
    pub const SUCCESS_MARKER: &str = "successMarker";
}

/// Built-in resilience map for the known layout variants of the listing page.
pub fn default_resilience_map() -> BTreeMap<String, String> {
    use names::*;
    [
        (EASY_APPLY_BUTTON, r#"button[aria-label^="Easy Apply to"]"#),
        (NEXT_BUTTON, r#"button[aria-label="Next"]"#),
        (REVIEW_BUTTON, r#"button[aria-label="Review your application"]"#),
        (SUBMIT_BUTTON, r#"button[aria-label="Submit application"]"#),
        (
            FOLLOW_COMPANY_CHECKBOX,
            r#"input[type="checkbox"][name="follow-company"]"#,
        ),
        (LISTING_CONTAINER, ".jobs-search-results-list"),
        (LISTING_ITEM, "li.jobs-search-results__list-item"),
        (
            LISTING_ACTION,
            "button.jobs-apply-button, button.jobs-apply-button--top-card",
        ),
        (LISTING_TITLE, "a.job-card-list__title"),
        (LISTING_COMPANY, "a.job-card-container__company-name"),
        (PHONE_FIELD, r#"input[id*="phoneNumber-"]"#),
        (EMAIL_FIELD, r#"input[id*="email-"]"#),
        (QUESTION_FIELD, r#"textarea[id*="question"]"#),
        (CONTENT_FIELD, r#"textarea[id*="coverletter"]"#),
        (JOB_DESCRIPTION, ".jobs-description__content"),
        (SUCCESS_MARKER, r#"[data-test-id="apply-form-success-card"]"#),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

/// Resolves logical names against the configured resilience map.
#[derive(Debug, Clone, Default)]
pub struct SelectorResolver {
    map: BTreeMap<String, String>,
}

impl SelectorResolver {
    pub fn new(map: BTreeMap<String, String>) -> Self {
        Self { map }
    }

    /// Built-in defaults overlaid with the stored map; stored entries win.
    pub fn with_defaults(configured: &BTreeMap<String, String>) -> Self {
        let mut map = default_resilience_map();
        for (name, value) in configured {
            map.insert(name.clone(), value.clone());
        }
        Self { map }
    }

    /// Ordered candidate locators for `name`. Never empty, never fails.
    pub fn resolve(&self, name: &str) -> Vec<String> {
        match self.map.get(name) {
            Some(value) if !value.trim().is_empty() => split_locators(value),
            _ => {
                warn!(name, "no resilient selector configured, using synthetic fallback");
                vec![synthetic_locator(name)]
            }
        }
    }
}

fn split_locators(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Deterministic last-resort locator derived from the logical name.
pub fn synthetic_locator(name: &str) -> String {
    format!(r#"[data-automation-id="{name}"]"#)
}
