//! Page driver abstraction.
//!
//! Everything above this module talks to a browser page only through the
//! [`PageDriver`] trait. Two implementations exist:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  PageDriver (async trait, &self methods)                     │
//! ├──────────────────────────────┬──────────────────────────────┤
//! │  CdpDriver (feature browser) │  MockDriver                  │
//! │  chromiumoxide over CDP      │  scripted in-memory page     │
//! └──────────────────────────────┴──────────────────────────────┘
//! ```
//!
//! Driver actions do not auto-wait; waiting is layered on top in
//! [`crate::wait`] and [`crate::page_object`].

use crate::locator::{Locator, Nth, Selector};
use crate::result::{ProbeError, ProbeResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Shared handle to a page
pub type SharedPage = Arc<dyn PageDriver>;

/// Snapshot of document loading progress
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentState {
    /// `document.readyState`: `loading`, `interactive` or `complete`
    pub ready_state: String,
    /// Resource entries loaded so far
    pub resource_count: u64,
}

impl DocumentState {
    /// A fully loaded document
    #[must_use]
    pub fn complete(resource_count: u64) -> Self {
        Self {
            ready_state: "complete".to_string(),
            resource_count,
        }
    }

    /// `DOMContentLoaded` has fired
    #[must_use]
    pub fn is_dom_loaded(&self) -> bool {
        matches!(self.ready_state.as_str(), "interactive" | "complete")
    }

    /// `load` has fired
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.ready_state == "complete"
    }
}

/// Primitive operations on one browser page.
///
/// Actions target the element the locator refers to and fail immediately
/// when it is missing. [`PageDriver::count`] counts selector matches; a
/// locator pinned with [`Locator::nth`] counts as 1 when that index exists.
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Navigate and wait for the `load` event
    async fn goto(&self, url: &str) -> ProbeResult<()>;

    /// Current page URL
    async fn current_url(&self) -> ProbeResult<String>;

    /// Document ready state and resource count
    async fn document_state(&self) -> ProbeResult<DocumentState>;

    /// Number of elements matched
    async fn count(&self, locator: &Locator) -> ProbeResult<usize>;

    /// Element exists and is rendered
    async fn is_visible(&self, locator: &Locator) -> ProbeResult<bool>;

    /// Element exists and is not disabled
    async fn is_enabled(&self, locator: &Locator) -> ProbeResult<bool>;

    /// Click the element
    async fn click(&self, locator: &Locator) -> ProbeResult<()>;

    /// Replace the element's value with `value`
    async fn fill(&self, locator: &Locator, value: &str) -> ProbeResult<()>;

    /// Empty the element's value
    async fn clear(&self, locator: &Locator) -> ProbeResult<()>;

    /// Press a key (`Enter`, `Escape`, ...) with the element focused
    async fn press(&self, locator: &Locator, key: &str) -> ProbeResult<()>;

    /// Current value of an input or textarea
    async fn input_value(&self, locator: &Locator) -> ProbeResult<String>;

    /// Text content of the element
    async fn text_content(&self, locator: &Locator) -> ProbeResult<Option<String>>;

    /// Serialized page HTML
    async fn content(&self) -> ProbeResult<String>;

    /// Full-page PNG screenshot
    async fn screenshot(&self) -> ProbeResult<Vec<u8>>;

    /// Close the page
    async fn close(&self) -> ProbeResult<()> {
        Ok(())
    }
}

// =============================================================================
// MOCK DRIVER
// =============================================================================

/// Side effect applied when a mock element is acted on
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockEffect {
    /// Change the page URL
    Navigate(String),
    /// Sleep before applying the remaining effects
    Delay(Duration),
    /// Fail the action with this driver message
    Fail(String),
    /// Fail the action because the page was torn down
    Teardown,
    /// Make matching elements visible
    Show(Selector),
    /// Make matching elements invisible
    Hide(Selector),
    /// Enable matching elements
    Enable(Selector),
    /// Disable matching elements
    Disable(Selector),
    /// Remove all elements for a selector
    Remove(Selector),
    /// Register an element
    Add(Selector, Box<MockElement>),
    /// Replace the page HTML
    SetContent(String),
}

/// Scripted element state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockElement {
    /// Rendered
    pub visible: bool,
    /// Not disabled
    pub enabled: bool,
    /// Input value
    pub value: String,
    /// Text content
    pub text: Option<String>,
    /// `fill` appends instead of replacing
    pub appends: bool,
    /// Effects of a click
    pub on_click: Vec<MockEffect>,
    /// Effects of any fill
    pub on_fill: Vec<MockEffect>,
    /// Effects of a fill with exactly this value
    pub on_fill_value: Vec<(String, Vec<MockEffect>)>,
    /// Effects of a key press
    pub on_press: Vec<MockEffect>,
}

impl Default for MockElement {
    fn default() -> Self {
        Self::visible()
    }
}

impl MockElement {
    /// Visible, enabled element
    #[must_use]
    pub fn visible() -> Self {
        Self {
            visible: true,
            enabled: true,
            value: String::new(),
            text: None,
            appends: false,
            on_click: Vec::new(),
            on_fill: Vec::new(),
            on_fill_value: Vec::new(),
            on_press: Vec::new(),
        }
    }

    /// Present but not rendered
    #[must_use]
    pub fn hidden() -> Self {
        Self {
            visible: false,
            ..Self::visible()
        }
    }

    /// Disabled
    #[must_use]
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Preset value
    #[must_use]
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }

    /// Preset text
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Fill concatenates onto the existing value
    #[must_use]
    pub fn appending(mut self) -> Self {
        self.appends = true;
        self
    }

    /// Add a click effect
    #[must_use]
    pub fn on_click(mut self, effect: MockEffect) -> Self {
        self.on_click.push(effect);
        self
    }

    /// Add a fill effect
    #[must_use]
    pub fn on_fill(mut self, effect: MockEffect) -> Self {
        self.on_fill.push(effect);
        self
    }

    /// Add an effect that fires only when filled with `value`
    #[must_use]
    pub fn on_fill_value(mut self, value: impl Into<String>, effect: MockEffect) -> Self {
        self.on_fill_value.push((value.into(), vec![effect]));
        self
    }

    /// Add a key press effect
    #[must_use]
    pub fn on_press(mut self, effect: MockEffect) -> Self {
        self.on_press.push(effect);
        self
    }
}

#[derive(Debug)]
struct MockState {
    url: String,
    content: String,
    document: DocumentState,
    elements: HashMap<Selector, Vec<MockElement>>,
    history: Vec<String>,
    fail_screenshots: bool,
}

/// In-memory page driven by scripted elements and effects
#[derive(Debug)]
pub struct MockDriver {
    state: Mutex<MockState>,
}

impl Default for MockDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl MockDriver {
    /// Blank page at `about:blank`
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState {
                url: "about:blank".to_string(),
                content: String::new(),
                document: DocumentState::complete(0),
                elements: HashMap::new(),
                history: Vec::new(),
                fail_screenshots: false,
            }),
        }
    }

    /// Shared handle usable wherever a [`SharedPage`] is expected
    #[must_use]
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Set the current URL without recording a navigation
    pub fn set_url(&self, url: impl Into<String>) {
        self.lock().url = url.into();
    }

    /// Set the page HTML
    pub fn set_content(&self, html: impl Into<String>) {
        self.lock().content = html.into();
    }

    /// Set the document state
    pub fn set_document(&self, document: DocumentState) {
        self.lock().document = document;
    }

    /// Make screenshots fail
    pub fn fail_screenshots(&self) {
        self.lock().fail_screenshots = true;
    }

    /// Register an element under `selector`
    pub fn add(&self, selector: Selector, element: MockElement) {
        self.lock().elements.entry(selector).or_default().push(element);
    }

    /// Remove every element under `selector`
    pub fn remove(&self, selector: &Selector) {
        self.lock().elements.remove(selector);
    }

    /// Value of the element a locator refers to
    #[must_use]
    pub fn value_of(&self, locator: &Locator) -> Option<String> {
        let state = self.lock();
        Self::find(&state, locator).map(|el| el.value.clone())
    }

    /// Recorded calls, oldest first
    #[must_use]
    pub fn history(&self) -> Vec<String> {
        self.lock().history.clone()
    }

    /// Number of recorded calls starting with `prefix`
    #[must_use]
    pub fn calls(&self, prefix: &str) -> usize {
        self.lock()
            .history
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    fn record(&self, entry: String) {
        self.lock().history.push(entry);
    }

    fn find<'a>(state: &'a MockState, locator: &Locator) -> Option<&'a MockElement> {
        let matches = state.elements.get(&locator.selector)?;
        locator.nth.pick(matches.len()).map(|i| &matches[i])
    }

    fn find_mut<'a>(state: &'a mut MockState, locator: &Locator) -> Option<&'a mut MockElement> {
        let matches = state.elements.get_mut(&locator.selector)?;
        let index = locator.nth.pick(matches.len())?;
        matches.get_mut(index)
    }

    fn not_found(locator: &Locator) -> ProbeError {
        ProbeError::ElementNotFound {
            locator: locator.label(),
        }
    }

    async fn apply(&self, action: &str, effects: Vec<MockEffect>) -> ProbeResult<()> {
        for effect in effects {
            match effect {
                MockEffect::Delay(d) => tokio::time::sleep(d).await,
                MockEffect::Fail(message) => return Err(ProbeError::action(action, message)),
                MockEffect::Teardown => {
                    return Err(ProbeError::TargetClosed {
                        message: format!("page closed during {action}"),
                    })
                }
                other => self.apply_state(other),
            }
        }
        Ok(())
    }

    fn apply_state(&self, effect: MockEffect) {
        fn update(state: &mut MockState, selector: &Selector, f: impl Fn(&mut MockElement)) {
            if let Some(els) = state.elements.get_mut(selector) {
                els.iter_mut().for_each(f);
            }
        }

        let mut state = self.lock();
        match effect {
            MockEffect::Show(s) => update(&mut state, &s, |e| e.visible = true),
            MockEffect::Hide(s) => update(&mut state, &s, |e| e.visible = false),
            MockEffect::Enable(s) => update(&mut state, &s, |e| e.enabled = true),
            MockEffect::Disable(s) => update(&mut state, &s, |e| e.enabled = false),
            MockEffect::Remove(s) => {
                state.elements.remove(&s);
            }
            MockEffect::Add(s, el) => state.elements.entry(s).or_default().push(*el),
            MockEffect::Navigate(url) => state.url = url,
            MockEffect::SetContent(html) => state.content = html,
            MockEffect::Delay(_) | MockEffect::Fail(_) | MockEffect::Teardown => {}
        }
    }

    /// Check the element is actionable and take its effects
    fn actionable(
        &self,
        action: &str,
        locator: &Locator,
        effects: impl FnOnce(&MockElement) -> Vec<MockEffect>,
    ) -> ProbeResult<Vec<MockEffect>> {
        let state = self.lock();
        let el = Self::find(&state, locator).ok_or_else(|| Self::not_found(locator))?;
        if !el.visible {
            return Err(ProbeError::action(action, format!("{} is not visible", locator.label())));
        }
        if !el.enabled {
            return Err(ProbeError::action(action, format!("{} is disabled", locator.label())));
        }
        Ok(effects(el))
    }
}

#[async_trait]
impl PageDriver for MockDriver {
    async fn goto(&self, url: &str) -> ProbeResult<()> {
        self.record(format!("goto {url}"));
        self.lock().url = url.to_string();
        Ok(())
    }

    async fn current_url(&self) -> ProbeResult<String> {
        Ok(self.lock().url.clone())
    }

    async fn document_state(&self) -> ProbeResult<DocumentState> {
        Ok(self.lock().document.clone())
    }

    async fn count(&self, locator: &Locator) -> ProbeResult<usize> {
        self.record(format!("count {locator}"));
        let state = self.lock();
        let len = state.elements.get(&locator.selector).map_or(0, Vec::len);
        Ok(match locator.nth {
            Nth::Index(_) => usize::from(locator.nth.pick(len).is_some()),
            Nth::First | Nth::Last => len,
        })
    }

    async fn is_visible(&self, locator: &Locator) -> ProbeResult<bool> {
        Ok(Self::find(&self.lock(), locator).is_some_and(|el| el.visible))
    }

    async fn is_enabled(&self, locator: &Locator) -> ProbeResult<bool> {
        let state = self.lock();
        let el = Self::find(&state, locator).ok_or_else(|| Self::not_found(locator))?;
        Ok(el.enabled)
    }

    async fn click(&self, locator: &Locator) -> ProbeResult<()> {
        self.record(format!("click {locator}"));
        let effects = self.actionable("click", locator, |el| el.on_click.clone())?;
        self.apply("click", effects).await
    }

    async fn fill(&self, locator: &Locator, value: &str) -> ProbeResult<()> {
        self.record(format!("fill {locator} = {value}"));
        let effects = self.actionable("fill", locator, |_| Vec::new()).map(|_| {
            let mut state = self.lock();
            let mut effects = Vec::new();
            if let Some(el) = Self::find_mut(&mut state, locator) {
                if el.appends {
                    el.value.push_str(value);
                } else {
                    el.value = value.to_string();
                }
                effects.extend(el.on_fill.iter().cloned());
                let filled = el.value.clone();
                for (expected, extra) in &el.on_fill_value {
                    if *expected == filled {
                        effects.extend(extra.iter().cloned());
                    }
                }
            }
            effects
        })?;
        self.apply("fill", effects).await
    }

    async fn clear(&self, locator: &Locator) -> ProbeResult<()> {
        self.record(format!("clear {locator}"));
        let mut state = self.lock();
        let el = Self::find_mut(&mut state, locator).ok_or_else(|| Self::not_found(locator))?;
        el.value.clear();
        Ok(())
    }

    async fn press(&self, locator: &Locator, key: &str) -> ProbeResult<()> {
        self.record(format!("press {locator} {key}"));
        let effects = self.actionable("press", locator, |el| el.on_press.clone())?;
        self.apply("press", effects).await
    }

    async fn input_value(&self, locator: &Locator) -> ProbeResult<String> {
        self.value_of(locator).ok_or_else(|| Self::not_found(locator))
    }

    async fn text_content(&self, locator: &Locator) -> ProbeResult<Option<String>> {
        let state = self.lock();
        let el = Self::find(&state, locator).ok_or_else(|| Self::not_found(locator))?;
        Ok(el.text.clone())
    }

    async fn content(&self) -> ProbeResult<String> {
        Ok(self.lock().content.clone())
    }

    async fn screenshot(&self) -> ProbeResult<Vec<u8>> {
        self.record("screenshot".to_string());
        if self.lock().fail_screenshots {
            return Err(ProbeError::ScreenshotError {
                message: "capture unavailable".to_string(),
            });
        }
        Ok(vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A])
    }
}
