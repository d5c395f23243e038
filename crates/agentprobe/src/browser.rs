//! Browser control over the Chrome DevTools Protocol.
//!
//! With the `browser` feature, [`Browser`] launches Chromium through
//! chromiumoxide and hands out [`CdpDriver`] pages, one isolated browser
//! context each. Locators are resolved inside the page: the serialized
//! [`Selector`](crate::locator::Selector) is passed to a resolver script,
//! and actions tag the resolved element so CDP can drive it through an
//! element handle.

use crate::config::SuiteConfig;
use crate::locator::{Locator, Nth};
use crate::result::ProbeResult;

/// Attribute used to hand a resolved element over to CDP
pub const TARGET_ATTRIBUTE: &str = "data-agentprobe-target";

/// Browser launch configuration
#[derive(Debug, Clone)]
pub struct BrowserConfig {
    /// Run without a window
    pub headless: bool,
    /// Viewport width
    pub viewport_width: u32,
    /// Viewport height
    pub viewport_height: u32,
    /// Path to the chromium binary (None = auto-detect)
    pub chromium_path: Option<String>,
    /// Sandbox mode (disable for containers)
    pub sandbox: bool,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            viewport_width: 1280,
            viewport_height: 720,
            chromium_path: None,
            sandbox: true,
        }
    }
}

impl BrowserConfig {
    /// Set viewport dimensions
    #[must_use]
    pub const fn with_viewport(mut self, width: u32, height: u32) -> Self {
        self.viewport_width = width;
        self.viewport_height = height;
        self
    }

    /// Set headless mode
    #[must_use]
    pub const fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Set chromium path
    #[must_use]
    pub fn with_chromium_path(mut self, path: impl Into<String>) -> Self {
        self.chromium_path = Some(path.into());
        self
    }

    /// Disable sandbox (for containers/CI)
    #[must_use]
    pub const fn with_no_sandbox(mut self) -> Self {
        self.sandbox = false;
        self
    }
}

impl From<&SuiteConfig> for BrowserConfig {
    fn from(config: &SuiteConfig) -> Self {
        Self::default()
            .with_headless(config.headless)
            .with_viewport(config.viewport_width, config.viewport_height)
    }
}

/// Resolver evaluated in the page.
///
/// Called as `(selector, index, pinned, op, arg)`; `index` is `-1` for the
/// last match and `pinned` marks an explicit `nth`. Always returns
/// `{found, value}`.
const RESOLVER: &str = r#"(sel, index, pinned, op, arg) => {
  const text = (e) => (e.innerText ?? e.textContent ?? '');
  const norm = (s) => s.replace(/\s+/g, ' ').trim();
  const contains = (hay, needle) => norm(hay).toLowerCase().includes(norm(needle).toLowerCase());
  const byText = (root, pred) => [...root.querySelectorAll('*')].filter((e) =>
    !['SCRIPT', 'STYLE', 'HEAD', 'TITLE'].includes(e.tagName) && pred(text(e)) &&
    ![...e.children].some((c) => pred(text(c))));
  const implicitRole = (e) => {
    const t = e.tagName;
    if (t === 'BUTTON') return 'button';
    if (t === 'A' && e.hasAttribute('href')) return 'link';
    if (t === 'TEXTAREA') return 'textbox';
    if (t === 'INPUT') {
      const type = (e.getAttribute('type') || 'text').toLowerCase();
      if (['button', 'submit', 'reset'].includes(type)) return 'button';
      if (['text', 'email', 'search', 'tel', 'url', 'password'].includes(type)) return 'textbox';
      return type;
    }
    if (t === 'DIALOG') return 'dialog';
    if (t === 'TR') return 'row';
    return null;
  };
  const role = (e) => e.getAttribute('role') || implicitRole(e);
  const labelsOf = (e) => {
    const out = [];
    const by = e.getAttribute('aria-labelledby');
    if (by) by.split(/\s+/).forEach((id) => { const l = document.getElementById(id); if (l) out.push(text(l)); });
    if (e.labels) [...e.labels].forEach((l) => out.push(text(l)));
    return out;
  };
  const accName = (e) => norm(e.getAttribute('aria-label') || labelsOf(e)[0] ||
    (['button', 'link', 'tab', 'menuitem', 'option'].includes(role(e)) ? text(e) : '') ||
    e.getAttribute('placeholder') || e.getAttribute('title') || '');
  const nameMatches = (name, want, exact) => exact ? name === norm(want) : contains(name, want);
  const all = (s, root) => {
    switch (s.kind) {
      case 'css': return [...root.querySelectorAll(s.css)];
      case 'text': return byText(root, (t) => s.exact ? norm(t) === norm(s.text) : contains(t, s.text));
      case 'text_matches': {
        const re = new RegExp(s.pattern, s.ignore_case ? 'i' : '');
        return byText(root, (t) => re.test(t));
      }
      case 'css_with_text': return [...root.querySelectorAll(s.css)].filter((e) => contains(text(e), s.text));
      case 'role': return [...root.querySelectorAll('*')].filter((e) => role(e) === s.role &&
        (s.name == null || nameMatches(accName(e), s.name, s.exact)));
      case 'label': return [...root.querySelectorAll('input, textarea, select, [contenteditable]')].filter((e) =>
        [...labelsOf(e), e.getAttribute('aria-label') || ''].some((l) =>
          s.exact ? norm(l) === norm(s.text) : contains(l, s.text)));
      case 'placeholder': return [...root.querySelectorAll('[placeholder]')].filter((e) =>
        contains(e.getAttribute('placeholder'), s.text));
      case 'within': return all(s.scope, root).flatMap((scope) => all(s.inner, scope));
      default: return [];
    }
  };
  const found = [...new Set(all(sel, document))];
  if (op === 'count') {
    return { found: true, value: pinned ? (index < found.length ? 1 : 0) : found.length };
  }
  const el = index < 0 ? found[found.length + index] : found[index];
  if (!el) return { found: false, value: null };
  switch (op) {
    case 'visible': {
      const r = el.getBoundingClientRect();
      const st = getComputedStyle(el);
      return { found: true, value: r.width > 0 && r.height > 0 && st.visibility !== 'hidden' && st.display !== 'none' };
    }
    case 'enabled':
      return { found: true, value: !el.disabled && el.getAttribute('aria-disabled') !== 'true' };
    case 'value': return { found: true, value: el.value ?? text(el) };
    case 'text': return { found: true, value: el.textContent };
    case 'clear': {
      if (el.isContentEditable) { el.textContent = ''; }
      else {
        const proto = el instanceof HTMLTextAreaElement ? HTMLTextAreaElement.prototype : HTMLInputElement.prototype;
        const setter = Object.getOwnPropertyDescriptor(proto, 'value').set;
        setter.call(el, '');
      }
      el.dispatchEvent(new Event('input', { bubbles: true }));
      el.dispatchEvent(new Event('change', { bubbles: true }));
      return { found: true, value: null };
    }
    case 'tag': el.setAttribute(arg.attribute, arg.id); return { found: true, value: null };
    default: return { found: false, value: null };
  }
}"#;

/// Script expression running `op` against `locator`
pub fn resolver_call(locator: &Locator, op: &str, arg: &serde_json::Value) -> ProbeResult<String> {
    let selector = serde_json::to_string(&locator.selector)?;
    let (index, pinned) = match locator.nth {
        Nth::First => (0_i64, false),
        Nth::Last => (-1, false),
        Nth::Index(i) => (i64::try_from(i).unwrap_or(i64::MAX), true),
    };
    let op = serde_json::to_string(op)?;
    Ok(format!("({RESOLVER})({selector}, {index}, {pinned}, {op}, {arg})"))
}

// ============================================================================
// CDP implementation (`browser` feature)
// ============================================================================

#[cfg(feature = "browser")]
mod cdp {
    use super::{resolver_call, BrowserConfig, TARGET_ATTRIBUTE};
    use crate::driver::{DocumentState, PageDriver, SharedPage};
    use crate::harness::PageFactory;
    use crate::locator::Locator;
    use crate::result::{ProbeError, ProbeResult};
    use async_trait::async_trait;
    use chromiumoxide::browser::{Browser as CdpBrowser, BrowserConfig as CdpConfig};
    use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
    use chromiumoxide::cdp::browser_protocol::browser::BrowserContextId;
    use chromiumoxide::cdp::browser_protocol::target::{
        CreateBrowserContextParams, CreateTargetParams, DisposeBrowserContextParams,
        GetBrowserContextsParams,
    };
    use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
    use chromiumoxide::element::Element;
    use chromiumoxide::handler::viewport::Viewport;
    use chromiumoxide::page::{Page as CdpPage, ScreenshotParams};
    use futures::StreamExt;
    use serde::Deserialize;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tokio::sync::Mutex;
    use tracing::{debug, info};

    fn page_error(e: impl std::fmt::Display) -> ProbeError {
        ProbeError::PageError {
            message: e.to_string(),
        }
    }

    /// Browser instance with a live CDP connection
    #[derive(Debug)]
    pub struct Browser {
        config: BrowserConfig,
        inner: Arc<Mutex<CdpBrowser>>,
        handle: tokio::task::JoinHandle<()>,
    }

    impl Browser {
        /// Launch Chromium
        pub async fn launch(config: BrowserConfig) -> ProbeResult<Self> {
            let mut builder = CdpConfig::builder()
                .window_size(config.viewport_width, config.viewport_height)
                .viewport(Viewport {
                    width: config.viewport_width,
                    height: config.viewport_height,
                    ..Viewport::default()
                });
            if !config.headless {
                builder = builder.with_head();
            }
            if !config.sandbox {
                builder = builder.no_sandbox();
            }
            if let Some(ref path) = config.chromium_path {
                builder = builder.chrome_executable(path);
            }

            let cdp_config = builder.build().map_err(|message| {
                if message.contains("auto detect") {
                    ProbeError::BrowserNotFound
                } else {
                    ProbeError::BrowserLaunchError { message }
                }
            })?;
            let (browser, mut handler) = CdpBrowser::launch(cdp_config).await.map_err(|e| {
                ProbeError::BrowserLaunchError {
                    message: e.to_string(),
                }
            })?;

            let handle = tokio::spawn(async move {
                while let Some(event) = handler.next().await {
                    if event.is_err() {
                        break;
                    }
                }
            });
            info!(headless = config.headless, "browser launched");

            Ok(Self {
                config,
                inner: Arc::new(Mutex::new(browser)),
                handle,
            })
        }

        /// Open a page in a fresh browser context
        pub async fn new_page(&self) -> ProbeResult<CdpDriver> {
            let mut browser = self.inner.lock().await;
            let context = browser
                .create_browser_context(CreateBrowserContextParams::default())
                .await
                .map_err(page_error)?;
            let params = CreateTargetParams::builder()
                .url("about:blank")
                .browser_context_id(context.clone())
                .build()
                .map_err(page_error)?;
            let page = browser.new_page(params).await.map_err(page_error)?;
            debug!(context = ?context, "page opened");
            Ok(CdpDriver {
                page,
                browser: self.inner.clone(),
                context,
            })
        }

        /// Browser contexts currently alive
        pub async fn context_ids(&self) -> ProbeResult<Vec<BrowserContextId>> {
            let browser = self.inner.lock().await;
            let response = browser
                .execute(GetBrowserContextsParams::default())
                .await
                .map_err(page_error)?;
            Ok(response.result.browser_context_ids)
        }

        /// Launch configuration
        #[must_use]
        pub const fn config(&self) -> &BrowserConfig {
            &self.config
        }

        /// Close the browser
        pub async fn close(&self) -> ProbeResult<()> {
            let mut browser = self.inner.lock().await;
            browser.close().await.map_err(|e| ProbeError::BrowserLaunchError {
                message: e.to_string(),
            })?;
            self.handle.abort();
            Ok(())
        }
    }

    #[async_trait]
    impl PageFactory for Browser {
        async fn new_page(&self) -> ProbeResult<SharedPage> {
            Ok(Arc::new(Self::new_page(self).await?))
        }
    }

    #[derive(Debug, Deserialize)]
    struct Resolved {
        found: bool,
        #[serde(default)]
        value: Value,
    }

    /// [`PageDriver`] over a CDP page.
    ///
    /// The page owns its browser context; closing the page disposes it.
    #[derive(Debug, Clone)]
    pub struct CdpDriver {
        page: CdpPage,
        browser: Arc<Mutex<CdpBrowser>>,
        context: BrowserContextId,
    }

    impl CdpDriver {
        /// Browser context holding this page
        #[must_use]
        pub const fn context_id(&self) -> &BrowserContextId {
            &self.context
        }

        async fn dispose_context(&self) -> ProbeResult<()> {
            let browser = self.browser.lock().await;
            browser
                .execute(DisposeBrowserContextParams::new(self.context.clone()))
                .await
                .map_err(page_error)?;
            debug!(context = ?self.context, "browser context disposed");
            Ok(())
        }

        async fn eval(&self, expression: String) -> ProbeResult<Value> {
            let params = EvaluateParams::builder()
                .expression(expression)
                .return_by_value(true)
                .await_promise(true)
                .build()
                .map_err(page_error)?;
            let result = self.page.evaluate_expression(params).await.map_err(page_error)?;
            result.into_value().map_err(page_error)
        }

        async fn resolve(&self, locator: &Locator, op: &str, arg: Value) -> ProbeResult<Resolved> {
            let value = self.eval(resolver_call(locator, op, &arg)?).await?;
            Ok(serde_json::from_value(value)?)
        }

        async fn found(&self, locator: &Locator, op: &str) -> ProbeResult<Value> {
            let resolved = self.resolve(locator, op, Value::Null).await?;
            if resolved.found {
                Ok(resolved.value)
            } else {
                Err(ProbeError::ElementNotFound {
                    locator: locator.label(),
                })
            }
        }

        /// Tag the resolved element and fetch a CDP handle for it
        async fn element(&self, locator: &Locator) -> ProbeResult<Element> {
            let id = uuid::Uuid::new_v4().simple().to_string();
            let arg = json!({ "attribute": TARGET_ATTRIBUTE, "id": id });
            if !self.resolve(locator, "tag", arg).await?.found {
                return Err(ProbeError::ElementNotFound {
                    locator: locator.label(),
                });
            }
            self.page
                .find_element(format!("[{TARGET_ATTRIBUTE}=\"{id}\"]"))
                .await
                .map_err(page_error)
        }
    }

    #[async_trait]
    impl PageDriver for CdpDriver {
        async fn goto(&self, url: &str) -> ProbeResult<()> {
            self.page
                .goto(url)
                .await
                .map_err(|e| ProbeError::NavigationError {
                    url: url.to_string(),
                    message: e.to_string(),
                })?;
            Ok(())
        }

        async fn current_url(&self) -> ProbeResult<String> {
            Ok(self
                .page
                .url()
                .await
                .map_err(page_error)?
                .unwrap_or_else(|| "about:blank".to_string()))
        }

        async fn document_state(&self) -> ProbeResult<DocumentState> {
            let value = self
                .eval(
                    "({ ready_state: document.readyState, \
                     resource_count: performance.getEntriesByType('resource').length })"
                        .to_string(),
                )
                .await?;
            Ok(serde_json::from_value(value)?)
        }

        async fn count(&self, locator: &Locator) -> ProbeResult<usize> {
            let resolved = self.resolve(locator, "count", Value::Null).await?;
            Ok(resolved.value.as_u64().map_or(0, |n| n as usize))
        }

        async fn is_visible(&self, locator: &Locator) -> ProbeResult<bool> {
            let resolved = self.resolve(locator, "visible", Value::Null).await?;
            Ok(resolved.found && resolved.value.as_bool().unwrap_or(false))
        }

        async fn is_enabled(&self, locator: &Locator) -> ProbeResult<bool> {
            Ok(self.found(locator, "enabled").await?.as_bool().unwrap_or(false))
        }

        async fn click(&self, locator: &Locator) -> ProbeResult<()> {
            let element = self.element(locator).await?;
            element
                .click()
                .await
                .map_err(|e| ProbeError::action("click", e.to_string()))?;
            Ok(())
        }

        async fn fill(&self, locator: &Locator, value: &str) -> ProbeResult<()> {
            self.found(locator, "clear").await?;
            let element = self.element(locator).await?;
            element
                .focus()
                .await
                .map_err(|e| ProbeError::action("fill", e.to_string()))?;
            element
                .type_str(value)
                .await
                .map_err(|e| ProbeError::action("fill", e.to_string()))?;
            Ok(())
        }

        async fn clear(&self, locator: &Locator) -> ProbeResult<()> {
            self.found(locator, "clear").await?;
            Ok(())
        }

        async fn press(&self, locator: &Locator, key: &str) -> ProbeResult<()> {
            let element = self.element(locator).await?;
            element
                .press_key(key)
                .await
                .map_err(|e| ProbeError::action("press", e.to_string()))?;
            Ok(())
        }

        async fn input_value(&self, locator: &Locator) -> ProbeResult<String> {
            let value = self.found(locator, "value").await?;
            Ok(value.as_str().unwrap_or_default().to_string())
        }

        async fn text_content(&self, locator: &Locator) -> ProbeResult<Option<String>> {
            let value = self.found(locator, "text").await?;
            Ok(value.as_str().map(str::to_string))
        }

        async fn content(&self) -> ProbeResult<String> {
            self.page.content().await.map_err(page_error)
        }

        async fn screenshot(&self) -> ProbeResult<Vec<u8>> {
            let params = ScreenshotParams::builder()
                .format(CaptureScreenshotFormat::Png)
                .full_page(true)
                .build();
            self.page
                .screenshot(params)
                .await
                .map_err(|e| ProbeError::ScreenshotError {
                    message: e.to_string(),
                })
        }

        async fn close(&self) -> ProbeResult<()> {
            let closed = self.page.clone().close().await.map_err(page_error);
            let disposed = self.dispose_context().await;
            closed.and(disposed)
        }
    }
}

#[cfg(feature = "browser")]
pub use cdp::{Browser, CdpDriver};
