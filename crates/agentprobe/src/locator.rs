//! Locators and resilient candidate resolution.
//!
//! A [`Selector`] describes how to find elements; a [`Locator`] narrows the
//! matches down to one (first, last, or by index) and carries a human
//! description for logs and errors.
//!
//! The application renders the same logical control with inconsistent
//! markup across layouts. A [`CandidateSet`] lists the known shapes for one
//! control in priority order and [`CandidateSet::resolve`] picks the first one
//! that is present on the page:
//!
//! ```text
//! name field ─┬─ input[name="name"]            (probe: count > 0 ?)
//!             ├─ input[placeholder*="Name" i]  (probe)
//!             └─ textarea[name="name"]         (probe)
//!                    │
//!                    └─► first hit is committed, never re-raced
//! ```

use crate::driver::PageDriver;
use crate::result::ProbeResult;
use crate::wait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// How to find elements on a page
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Selector {
    /// CSS selector, including attribute flags such as `[placeholder*="x" i]`
    Css {
        /// Selector text
        css: String,
    },
    /// Element whose visible text contains (or equals) `text`
    Text {
        /// Text to match
        text: String,
        /// Require the trimmed text to equal `text`
        exact: bool,
    },
    /// Element whose visible text matches a regular expression
    TextMatches {
        /// JavaScript-compatible pattern
        pattern: String,
        /// Case-insensitive match
        ignore_case: bool,
    },
    /// CSS selector filtered by contained text
    CssWithText {
        /// Base CSS selector
        css: String,
        /// Text the element must contain
        text: String,
    },
    /// ARIA role with an optional accessible name
    Role {
        /// ARIA role (`button`, `textbox`, `menuitem`, ...)
        role: String,
        /// Accessible name
        name: Option<String>,
        /// Require the accessible name to match exactly
        exact: bool,
    },
    /// Form control associated with a label
    Label {
        /// Label text
        text: String,
        /// Require the label text to match exactly
        exact: bool,
    },
    /// Input whose placeholder contains `text` (case-insensitive)
    Placeholder {
        /// Placeholder fragment
        text: String,
    },
    /// `inner` matched only inside elements matched by `scope`
    Within {
        /// Scope selector
        scope: Box<Selector>,
        /// Selector applied inside the scope
        inner: Box<Selector>,
    },
}

impl Selector {
    /// CSS selector
    #[must_use]
    pub fn css(css: impl Into<String>) -> Self {
        Self::Css { css: css.into() }
    }

    /// Substring text selector
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text {
            text: text.into(),
            exact: false,
        }
    }

    /// Exact text selector
    #[must_use]
    pub fn exact_text(text: impl Into<String>) -> Self {
        Self::Text {
            text: text.into(),
            exact: true,
        }
    }

    /// Case-insensitive regex text selector
    #[must_use]
    pub fn text_matches(pattern: impl Into<String>) -> Self {
        Self::TextMatches {
            pattern: pattern.into(),
            ignore_case: true,
        }
    }

    /// CSS selector filtered by text
    #[must_use]
    pub fn css_with_text(css: impl Into<String>, text: impl Into<String>) -> Self {
        Self::CssWithText {
            css: css.into(),
            text: text.into(),
        }
    }

    /// Role without a name constraint
    #[must_use]
    pub fn role(role: impl Into<String>) -> Self {
        Self::Role {
            role: role.into(),
            name: None,
            exact: false,
        }
    }

    /// Role with an accessible name (substring, case-insensitive)
    #[must_use]
    pub fn role_named(role: impl Into<String>, name: impl Into<String>) -> Self {
        Self::Role {
            role: role.into(),
            name: Some(name.into()),
            exact: false,
        }
    }

    /// Role with an exact accessible name
    #[must_use]
    pub fn role_exact(role: impl Into<String>, name: impl Into<String>) -> Self {
        Self::Role {
            role: role.into(),
            name: Some(name.into()),
            exact: true,
        }
    }

    /// Control labelled by `text`
    #[must_use]
    pub fn label(text: impl Into<String>) -> Self {
        Self::Label {
            text: text.into(),
            exact: false,
        }
    }

    /// Input with a placeholder containing `text`
    #[must_use]
    pub fn placeholder(text: impl Into<String>) -> Self {
        Self::Placeholder { text: text.into() }
    }

    /// Restrict this selector to matches inside `scope`
    #[must_use]
    pub fn within(self, scope: Self) -> Self {
        Self::Within {
            scope: Box::new(scope),
            inner: Box::new(self),
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Css { css } => write!(f, "css={css}"),
            Self::Text { text, exact: true } => write!(f, "text=\"{text}\""),
            Self::Text { text, .. } => write!(f, "text={text}"),
            Self::TextMatches {
                pattern,
                ignore_case,
            } => write!(f, "text=/{pattern}/{}", if *ignore_case { "i" } else { "" }),
            Self::CssWithText { css, text } => write!(f, "{css}:has-text(\"{text}\")"),
            Self::Role { role, name: None, .. } => write!(f, "role={role}"),
            Self::Role {
                role,
                name: Some(name),
                ..
            } => write!(f, "role={role}[name=\"{name}\"]"),
            Self::Label { text, .. } => write!(f, "label={text}"),
            Self::Placeholder { text } => write!(f, "placeholder={text}"),
            Self::Within { scope, inner } => write!(f, "{scope} >> {inner}"),
        }
    }
}

/// Which of several matches a locator refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Nth {
    /// First match in document order
    #[default]
    First,
    /// Last match in document order
    Last,
    /// Zero-based index
    Index(usize),
}

impl Nth {
    /// Index into a match list of length `len`
    #[must_use]
    pub const fn pick(self, len: usize) -> Option<usize> {
        match self {
            _ if len == 0 => None,
            Self::First => Some(0),
            Self::Last => Some(len - 1),
            Self::Index(i) if i < len => Some(i),
            Self::Index(_) => None,
        }
    }
}

/// A selector narrowed to a single element
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Locator {
    /// What to match
    pub selector: Selector,
    /// Which match
    pub nth: Nth,
    /// Human description used in logs and errors
    pub description: Option<String>,
}

impl Locator {
    /// Locator for the first match of `selector`
    #[must_use]
    pub fn new(selector: Selector) -> Self {
        Self {
            selector,
            nth: Nth::First,
            description: None,
        }
    }

    /// Shorthand for a CSS locator
    #[must_use]
    pub fn css(css: impl Into<String>) -> Self {
        Self::new(Selector::css(css))
    }

    /// Refer to the last match
    #[must_use]
    pub const fn last(mut self) -> Self {
        self.nth = Nth::Last;
        self
    }

    /// Refer to the match at `index`
    #[must_use]
    pub const fn nth(mut self, index: usize) -> Self {
        self.nth = Nth::Index(index);
        self
    }

    /// Attach a description
    #[must_use]
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Description, falling back to the selector text
    #[must_use]
    pub fn label(&self) -> String {
        self.description
            .clone()
            .unwrap_or_else(|| self.to_string())
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.nth {
            Nth::First => write!(f, "{}", self.selector),
            Nth::Last => write!(f, "{} >> last", self.selector),
            Nth::Index(i) => write!(f, "{} >> nth={i}", self.selector),
        }
    }
}

impl From<Selector> for Locator {
    fn from(selector: Selector) -> Self {
        Self::new(selector)
    }
}

/// Outcome of a successful resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Committed locator
    pub locator: Locator,
    /// Position of the winner in the candidate list
    pub index: usize,
}

/// Ordered candidate locators for one logical control
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateSet {
    name: String,
    candidates: Vec<Locator>,
}

impl CandidateSet {
    /// Empty set for the control called `name`
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            candidates: Vec::new(),
        }
    }

    /// Append a candidate; earlier candidates win
    #[must_use]
    pub fn or(mut self, candidate: impl Into<Locator>) -> Self {
        self.candidates.push(candidate.into());
        self
    }

    /// Append a CSS candidate
    #[must_use]
    pub fn or_css(self, css: impl Into<String>) -> Self {
        self.or(Locator::css(css))
    }

    /// Logical control name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Candidates in priority order
    #[must_use]
    pub fn candidates(&self) -> &[Locator] {
        &self.candidates
    }

    /// Number of candidates
    #[must_use]
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    /// Whether the set has no candidates
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Probe candidates in order and commit to the first one present.
    ///
    /// With `visibility` set, the committed candidate must become visible
    /// within that bound or the timeout is returned to the caller; other
    /// candidates are not tried after commitment. Returns `Ok(None)` when no
    /// candidate is present.
    pub async fn resolve(
        &self,
        page: &dyn PageDriver,
        visibility: Option<Duration>,
    ) -> ProbeResult<Option<Resolution>> {
        for (index, locator) in self.candidates.iter().enumerate() {
            let present = match page.count(locator).await {
                Ok(n) => n > 0,
                Err(e) => {
                    tracing::debug!(control = %self.name, %locator, error = %e, "candidate lookup failed");
                    false
                }
            };
            if !present {
                tracing::debug!(control = %self.name, %locator, "candidate absent");
                continue;
            }

            tracing::debug!(control = %self.name, %locator, index, "candidate committed");
            if let Some(bound) = visibility {
                wait::wait_for_visible(page, locator, bound).await?;
            }
            let locator = locator
                .clone()
                .describe(self.name.clone());
            return Ok(Some(Resolution { locator, index }));
        }
        Ok(None)
    }
}

impl CandidateSet {
    /// Poll until some candidate is present and commit to it.
    ///
    /// Unlike [`CandidateSet::resolve`] an empty page is not an answer: the
    /// set is re-probed until `timeout`, for controls that render late.
    pub async fn wait_for_any(
        &self,
        page: &dyn PageDriver,
        timeout: Duration,
    ) -> ProbeResult<Resolution> {
        let what = format!("any {} candidate", self.name);
        wait::poll_until(timeout, &what, move || async move {
            self.resolve(page, None).await.ok().flatten()
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod selector_tests {
        use super::*;

        #[test]
        fn test_display() {
            assert_eq!(Selector::css("input").to_string(), "css=input");
            assert_eq!(
                Selector::role_exact("button", "Save").to_string(),
                "role=button[name=\"Save\"]"
            );
            assert_eq!(
                Selector::text_matches("no (agents|results)").to_string(),
                "text=/no (agents|results)/i"
            );
            assert_eq!(
                Selector::css_with_text("button", "+ Agent").to_string(),
                "button:has-text(\"+ Agent\")"
            );
            assert_eq!(
                Selector::role_exact("textbox", "Name")
                    .within(Selector::role("dialog"))
                    .to_string(),
                "role=dialog >> role=textbox[name=\"Name\"]"
            );
        }

        #[test]
        fn test_serde_tagged() {
            let json = serde_json::to_value(Selector::label("Context")).unwrap();
            assert_eq!(json["kind"], "label");
            assert_eq!(json["text"], "Context");

            let back: Selector = serde_json::from_value(json).unwrap();
            assert_eq!(back, Selector::label("Context"));
        }
    }

    mod nth_tests {
        use super::*;

        #[test]
        fn test_pick() {
            assert_eq!(Nth::First.pick(3), Some(0));
            assert_eq!(Nth::Last.pick(3), Some(2));
            assert_eq!(Nth::Index(2).pick(3), Some(2));
            assert_eq!(Nth::Index(3).pick(3), None);
            assert_eq!(Nth::Last.pick(0), None);
        }

        #[test]
        fn test_locator_display() {
            assert_eq!(Locator::css("textarea").nth(2).to_string(), "css=textarea >> nth=2");
            assert_eq!(Locator::css("input").last().to_string(), "css=input >> last");
        }

        #[test]
        fn test_label_prefers_description() {
            let loc = Locator::css("#undefined-action").describe("agent menu");
            assert_eq!(loc.label(), "agent menu");
            assert_eq!(Locator::css("a").label(), "css=a");
        }
    }

    mod candidate_tests {
        use super::*;
        use crate::driver::{MockDriver, MockElement};
        use crate::result::ProbeError;

        fn name_field() -> CandidateSet {
            CandidateSet::new("name field")
                .or_css("input[name=\"name\"]")
                .or_css("input[placeholder*=\"Name\" i]")
                .or_css("textarea[name=\"name\"]")
        }

        #[tokio::test(start_paused = true)]
        async fn test_first_present_candidate_wins() {
            let page = MockDriver::new();
            page.add(Selector::css("input[placeholder*=\"Name\" i]"), MockElement::visible());
            page.add(Selector::css("textarea[name=\"name\"]"), MockElement::visible());

            let res = name_field().resolve(&page, None).await.unwrap().unwrap();
            assert_eq!(res.index, 1);
            assert_eq!(res.locator.label(), "name field");
        }

        #[tokio::test(start_paused = true)]
        async fn test_exhausted_returns_none() {
            let page = MockDriver::new();
            assert!(name_field().resolve(&page, None).await.unwrap().is_none());
        }

        #[tokio::test(start_paused = true)]
        async fn test_hidden_after_commit_is_not_retried() {
            let page = MockDriver::new();
            page.add(Selector::css("input[name=\"name\"]"), MockElement::hidden());
            page.add(Selector::css("textarea[name=\"name\"]"), MockElement::visible());

            let err = name_field()
                .resolve(&page, Some(Duration::from_millis(500)))
                .await
                .unwrap_err();
            assert!(matches!(err, ProbeError::Timeout { ms: 500, .. }));
        }

        #[tokio::test(start_paused = true)]
        async fn test_wait_for_any_sees_late_control() {
            let page = std::sync::Arc::new(MockDriver::new());
            let bg = page.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_secs(3)).await;
                bg.add(Selector::css("textarea[name=\"name\"]"), MockElement::visible());
            });

            let res = name_field()
                .wait_for_any(page.as_ref(), Duration::from_secs(10))
                .await
                .unwrap();
            assert_eq!(res.index, 2);
            assert!(name_field()
                .wait_for_any(&MockDriver::new(), Duration::from_secs(1))
                .await
                .is_err());
        }

        #[tokio::test(start_paused = true)]
        async fn test_probe_order_is_sequential() {
            let page = MockDriver::new();
            page.add(Selector::css("textarea[name=\"name\"]"), MockElement::visible());

            name_field().resolve(&page, None).await.unwrap();
            let probes: Vec<String> = page
                .history()
                .into_iter()
                .filter(|c| c.starts_with("count"))
                .collect();
            assert_eq!(probes.len(), 3);
            assert!(probes[0].contains("input[name"));
            assert!(probes[2].contains("textarea"));
        }
    }
}
