//! Driver adapter seam.
//!
//! The core is agnostic to the underlying automation protocol; it only
//! requires the primitives below. A real Chrome DevTools Protocol
//! implementation is provided behind the `browser` feature; the
//! [`testkit`](crate::testkit) module provides a scripted in-memory
//! implementation for tests.
//!
//! Element handles are borrowed per query and never survive a
//! navigation: any element operation may fail with
//! [`PaseoError::StaleElement`] if the page re-rendered concurrently,
//! and callers must treat that as an expected, recoverable condition.

use async_trait::async_trait;
use serde_json::Value;
use std::path::Path;

use crate::locator::Locator;
use crate::result::PaseoResult;

/// A handle to one element resolved from a locator.
#[async_trait]
pub trait Element: Send + Sync {
    /// Click the element
    async fn click(&self) -> PaseoResult<()>;

    /// Type text into the element
    async fn send_keys(&self, text: &str) -> PaseoResult<()>;

    /// Clear the element's current value
    async fn clear(&self) -> PaseoResult<()>;

    /// Whether the element is rendered and visible
    async fn is_displayed(&self) -> PaseoResult<bool>;

    /// Whether the element accepts interaction
    async fn is_enabled(&self) -> PaseoResult<bool>;

    /// Whether the element lies fully inside the visual viewport
    async fn in_viewport(&self) -> PaseoResult<bool>;

    /// The element's rendered text content
    async fn text(&self) -> PaseoResult<String>;
}

/// Browser driving primitives consumed by the core.
///
/// One driver instance backs exactly one browser session; sessions are
/// the unit of isolation and are never shared between concurrently
/// running scenarios.
#[async_trait]
pub trait Driver: Send + Sync {
    /// Element handle type produced by this driver
    type Element: Element;

    /// Navigate to a URL
    async fn navigate(&self, url: &str) -> PaseoResult<()>;

    /// Find all elements matching the locator (possibly none)
    async fn find_elements(&self, locator: &Locator) -> PaseoResult<Vec<Self::Element>>;

    /// Evaluate a JavaScript expression and return its value.
    ///
    /// When `args` is non-empty the expression is evaluated with a
    /// JSON-serialized `args` array in scope.
    async fn execute_script(&self, script: &str, args: Vec<Value>) -> PaseoResult<Value>;

    /// Capture a PNG screenshot to the given path
    async fn screenshot(&self, path: &Path) -> PaseoResult<()>;

    /// The URL of the current page
    async fn current_url(&self) -> PaseoResult<String>;

    /// Shut down the underlying browser session
    async fn quit(&self) -> PaseoResult<()> {
        Ok(())
    }
}

// ============================================================================
// Real CDP implementation (when the `browser` feature is enabled)
// ============================================================================

/// Launch options for the CDP-backed driver
#[derive(Debug, Clone)]
pub struct BrowserOptions {
    /// Run in headless mode
    pub headless: bool,
    /// Viewport width
    pub viewport_width: u32,
    /// Viewport height
    pub viewport_height: u32,
    /// User agent override (mobile emulation)
    pub user_agent: Option<String>,
    /// Path to chromium binary (None = auto-detect)
    pub chromium_path: Option<String>,
    /// Sandbox mode (disable for containers)
    pub sandbox: bool,
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self {
            headless: true,
            viewport_width: 430,
            viewport_height: 932,
            user_agent: None,
            chromium_path: None,
            sandbox: true,
        }
    }
}

impl BrowserOptions {
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

    /// Set the user agent
    #[must_use]
    pub fn with_user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = Some(ua.into());
        self
    }

    /// Set the chromium binary path
    #[must_use]
    pub fn with_chromium_path(mut self, path: impl Into<String>) -> Self {
        self.chromium_path = Some(path.into());
        self
    }

    /// Disable the sandbox (for containers/CI)
    #[must_use]
    pub const fn with_no_sandbox(mut self) -> Self {
        self.sandbox = false;
        self
    }
}

#[cfg(feature = "browser")]
pub use cdp::{CdpDriver, CdpElement};

#[cfg(feature = "browser")]
mod cdp {
    use super::{async_trait, BrowserOptions, Driver, Element, Locator, PaseoResult, Path, Value};
    use crate::result::PaseoError;
    use chromiumoxide::browser::{Browser as CdpBrowser, BrowserConfig as CdpConfig};
    use chromiumoxide::cdp::browser_protocol::page::{
        CaptureScreenshotFormat, CaptureScreenshotParams,
    };
    use chromiumoxide::page::Page as CdpPage;
    use futures::StreamExt;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    fn classify(locator: &str, err: &chromiumoxide::error::CdpError) -> PaseoError {
        let message = err.to_string();
        let lower = message.to_lowercase();
        if lower.contains("detached") || lower.contains("could not find node") {
            PaseoError::StaleElement {
                locator: locator.to_string(),
            }
        } else if lower.contains("intercept") {
            PaseoError::ClickIntercepted {
                locator: locator.to_string(),
            }
        } else {
            PaseoError::Driver { message }
        }
    }

    /// Driver backed by a real chromium instance over CDP
    #[derive(Debug)]
    pub struct CdpDriver {
        page: CdpPage,
        browser: Arc<Mutex<CdpBrowser>>,
        #[allow(dead_code)]
        handle: tokio::task::JoinHandle<()>,
    }

    impl CdpDriver {
        /// Launch a browser and open a blank page
        ///
        /// # Errors
        ///
        /// Returns an error if the browser cannot be launched or the
        /// initial page cannot be created.
        pub async fn launch(options: &BrowserOptions) -> PaseoResult<Self> {
            let mut builder = CdpConfig::builder()
                .window_size(options.viewport_width, options.viewport_height);

            if !options.headless {
                builder = builder.with_head();
            }
            if !options.sandbox {
                builder = builder.no_sandbox();
            }
            if let Some(ref path) = options.chromium_path {
                builder = builder.chrome_executable(path);
            }

            let config = builder.build().map_err(|e| PaseoError::BrowserLaunch {
                message: e.to_string(),
            })?;

            let (browser, mut handler) =
                CdpBrowser::launch(config)
                    .await
                    .map_err(|e| PaseoError::BrowserLaunch {
                        message: e.to_string(),
                    })?;

            let handle = tokio::spawn(async move {
                while let Some(event) = handler.next().await {
                    if event.is_err() {
                        break;
                    }
                }
            });

            let page = browser
                .new_page("about:blank")
                .await
                .map_err(|e| PaseoError::Driver {
                    message: e.to_string(),
                })?;

            if let Some(ref ua) = options.user_agent {
                page.set_user_agent(ua)
                    .await
                    .map_err(|e| PaseoError::Driver {
                        message: e.to_string(),
                    })?;
            }

            Ok(Self {
                page,
                browser: Arc::new(Mutex::new(browser)),
                handle,
            })
        }
    }

    #[async_trait]
    impl Driver for CdpDriver {
        type Element = CdpElement;

        async fn navigate(&self, url: &str) -> PaseoResult<()> {
            self.page
                .goto(url)
                .await
                .map_err(|e| PaseoError::Navigation {
                    url: url.to_string(),
                    message: e.to_string(),
                })?;
            Ok(())
        }

        async fn find_elements(&self, locator: &Locator) -> PaseoResult<Vec<Self::Element>> {
            let Some(css) = locator.as_css() else {
                return Err(PaseoError::Driver {
                    message: format!("CDP driver resolves CSS locators only, got {locator}"),
                });
            };
            let elements = match self.page.find_elements(css).await {
                Ok(elements) => elements,
                // A selector that matches nothing is a normal outcome
                Err(chromiumoxide::error::CdpError::NotFound) => Vec::new(),
                Err(e) => return Err(classify(&locator.to_string(), &e)),
            };
            Ok(elements
                .into_iter()
                .map(|inner| CdpElement {
                    inner,
                    locator: locator.to_string(),
                })
                .collect())
        }

        async fn execute_script(&self, script: &str, args: Vec<Value>) -> PaseoResult<Value> {
            let expr = if args.is_empty() {
                script.to_string()
            } else {
                format!(
                    "(function(args) {{ return ({script}); }})({})",
                    Value::Array(args)
                )
            };
            let result = self
                .page
                .evaluate(expr)
                .await
                .map_err(|e| PaseoError::Script {
                    message: e.to_string(),
                })?;
            Ok(result.into_value().unwrap_or(Value::Null))
        }

        async fn screenshot(&self, path: &Path) -> PaseoResult<()> {
            let params = CaptureScreenshotParams::builder()
                .format(CaptureScreenshotFormat::Png)
                .build();
            let screenshot =
                self.page
                    .execute(params)
                    .await
                    .map_err(|e| PaseoError::Screenshot {
                        message: e.to_string(),
                    })?;

            use base64::Engine;
            let bytes = base64::engine::general_purpose::STANDARD
                .decode(&screenshot.data)
                .map_err(|e| PaseoError::Screenshot {
                    message: e.to_string(),
                })?;
            tokio::fs::write(path, bytes).await?;
            Ok(())
        }

        async fn current_url(&self) -> PaseoResult<String> {
            let url = self.page.url().await.map_err(|e| PaseoError::Driver {
                message: e.to_string(),
            })?;
            Ok(url.unwrap_or_default())
        }

        async fn quit(&self) -> PaseoResult<()> {
            let mut browser = self.browser.lock().await;
            browser.close().await.map_err(|e| PaseoError::Driver {
                message: e.to_string(),
            })?;
            Ok(())
        }
    }

    /// Element handle resolved through CDP
    #[derive(Debug)]
    pub struct CdpElement {
        inner: chromiumoxide::element::Element,
        locator: String,
    }

    impl CdpElement {
        async fn eval_on_self(&self, function: &str) -> PaseoResult<Value> {
            let returns = self
                .inner
                .call_js_fn(function, false)
                .await
                .map_err(|e| classify(&self.locator, &e))?;
            Ok(returns.result.value.unwrap_or(Value::Null))
        }
    }

    #[async_trait]
    impl Element for CdpElement {
        async fn click(&self) -> PaseoResult<()> {
            self.inner
                .click()
                .await
                .map_err(|e| classify(&self.locator, &e))?;
            Ok(())
        }

        async fn send_keys(&self, text: &str) -> PaseoResult<()> {
            self.inner
                .type_str(text)
                .await
                .map_err(|e| classify(&self.locator, &e))?;
            Ok(())
        }

        async fn clear(&self) -> PaseoResult<()> {
            self.eval_on_self(
                "function() { this.value = ''; \
                 this.dispatchEvent(new Event('input', { bubbles: true })); }",
            )
            .await?;
            Ok(())
        }

        async fn is_displayed(&self) -> PaseoResult<bool> {
            let value = self
                .eval_on_self(
                    "function() { \
                     const rect = this.getBoundingClientRect(); \
                     const style = window.getComputedStyle(this); \
                     return rect.width > 0 && rect.height > 0 && \
                            style.visibility !== 'hidden' && style.display !== 'none'; }",
                )
                .await?;
            Ok(value.as_bool().unwrap_or(false))
        }

        async fn is_enabled(&self) -> PaseoResult<bool> {
            let value = self
                .eval_on_self("function() { return !this.disabled; }")
                .await?;
            Ok(value.as_bool().unwrap_or(false))
        }

        async fn in_viewport(&self) -> PaseoResult<bool> {
            let value = self
                .eval_on_self(
                    "function() { \
                     const rect = this.getBoundingClientRect(); \
                     const h = window.innerHeight || document.documentElement.clientHeight; \
                     const w = window.innerWidth || document.documentElement.clientWidth; \
                     return rect.top >= 0 && rect.bottom <= h && \
                            rect.left >= 0 && rect.right <= w; }",
                )
                .await?;
            Ok(value.as_bool().unwrap_or(false))
        }

        async fn text(&self) -> PaseoResult<String> {
            let text = self
                .inner
                .inner_text()
                .await
                .map_err(|e| classify(&self.locator, &e))?;
            Ok(text.unwrap_or_default())
        }
    }
}
