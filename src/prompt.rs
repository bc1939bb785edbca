//! Prompt templating by literal token substitution.
//!
//! Substitution is a single left-to-right pass: inserted values are never
//! rescanned, so the order in which tokens are supplied does not matter and
//! a value that happens to contain another token stays untouched. Tokens
//! with no supplied value are left in the output as written.

use crate::session::Profile;

pub const PROFILE_TOKEN: &str = "{profile.json}";
pub const DESCRIPTION_TOKEN: &str = "{Job Description}";
pub const QUESTION_TOKEN: &str = "{the question}";

/// Replace every occurrence of each token in `template` with its value.
pub fn render(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    'scan: while !rest.is_empty() {
        for (token, value) in values {
            if !token.is_empty()
                && let Some(tail) = rest.strip_prefix(token)
            {
                out.push_str(value);
                rest = tail;
                continue 'scan;
            }
        }
        let mut chars = rest.chars();
        if let Some(c) = chars.next() {
            out.push(c);
        }
        rest = chars.as_str();
    }
    out
}

/// Prompt for free-text content (cover letter) from the profile and description.
pub fn content_prompt(template: &str, profile: &Profile, description: &str) -> String {
    let profile_json = profile.to_pretty_json();
    render(
        template,
        &[(PROFILE_TOKEN, profile_json.as_str()), (DESCRIPTION_TOKEN, description)],
    )
}

/// Prompt asking for a suggested answer to one form question.
pub fn question_prompt(
    template: &str,
    profile: &Profile,
    description: &str,
    question: &str,
) -> String {
    let profile_json = profile.to_pretty_json();
    render(
        template,
        &[
            (QUESTION_TOKEN, question),
            (PROFILE_TOKEN, profile_json.as_str()),
            (DESCRIPTION_TOKEN, description),
        ],
    )
}
