//! Page objects and the page facade.
//!
//! A [`PageObject`] describes one logical page: how its URL looks and,
//! optionally, a marker element that proves the page rendered. The
//! [`Page`] facade bundles the stability detector, interaction guard,
//! and popup resolver over one session, so scenario code reads as a
//! sequence of page-level verbs.

use std::time::Duration;
use tracing::{debug, info};

use crate::assertion;
use crate::config::SuiteConfig;
use crate::driver::Driver;
use crate::interaction::{InteractionGuard, ScrollOptions};
use crate::locator::Locator;
use crate::popup::{PopupOptions, PopupOutcome, PopupResolver};
use crate::result::{PaseoError, PaseoResult};
use crate::session::{Checkpoint, Session};
use crate::stability::{StabilityDetector, StabilityOptions};
use crate::wait::{UrlPattern, WaitOptions};

/// A logical page of the site under test.
pub trait PageObject {
    /// Pattern the page's URL must match
    fn url_pattern() -> UrlPattern;

    /// Element whose presence proves the page rendered, if it has one
    fn ready_marker() -> Option<Locator> {
        None
    }

    /// How long this page may take to load
    fn load_timeout() -> Duration {
        Duration::from_secs(15)
    }

    /// Name used in logs and assertion messages
    #[must_use]
    fn page_name() -> &'static str {
        let full = std::any::type_name::<Self>();
        full.rsplit("::").next().unwrap_or(full)
    }
}

/// Page-level verbs over one session.
#[derive(Debug)]
pub struct Page<'s, D: Driver> {
    session: &'s Session<D>,
    stability: StabilityDetector,
    guard: InteractionGuard,
    popups: PopupResolver,
    waits: WaitOptions,
    scroll: ScrollOptions,
}

impl<'s, D: Driver> Page<'s, D> {
    /// Create a facade with explicit component options
    #[must_use]
    pub const fn new(
        session: &'s Session<D>,
        stability: StabilityOptions,
        waits: WaitOptions,
        popups: PopupOptions,
        scroll: ScrollOptions,
    ) -> Self {
        Self {
            session,
            stability: StabilityDetector::new(stability),
            guard: InteractionGuard::new(waits),
            popups: PopupResolver::new(popups),
            waits,
            scroll,
        }
    }

    /// Create a facade with all options derived from a suite config
    #[must_use]
    pub fn from_config(session: &'s Session<D>, config: &SuiteConfig) -> Self {
        Self::new(
            session,
            config.stability_options(),
            config.wait_options(),
            config.popup_options(),
            config.scroll_options(),
        )
    }

    /// The session this facade operates on
    #[must_use]
    pub const fn session(&self) -> &'s Session<D> {
        self.session
    }

    fn driver(&self) -> &D {
        self.session.driver()
    }

    /// Navigate to a URL and wait for the page to settle, capturing a
    /// home-loaded screenshot. Stability timing out is logged, not
    /// fatal; the capture failing is equally non-fatal.
    ///
    /// # Errors
    ///
    /// Returns an error if navigation itself fails.
    pub async fn open(&self, url: &str) -> PaseoResult<()> {
        info!(url, "opening page");
        self.driver().navigate(url).await?;
        self.stability.wait_until_stable(self.driver()).await?;
        self.session.capture(Checkpoint::HomeLoaded).await.ok();
        Ok(())
    }

    /// Wait for the current page to settle; `true` when it stabilized
    ///
    /// # Errors
    ///
    /// Returns an error on hard driver failures.
    pub async fn wait_for_stable(&self) -> PaseoResult<bool> {
        self.stability.wait_until_stable(self.driver()).await
    }

    /// Guarded click; `true` when a click landed
    ///
    /// # Errors
    ///
    /// Returns an error on hard driver failures.
    pub async fn click(&self, locator: &Locator) -> PaseoResult<bool> {
        self.guard.click(self.driver(), locator).await
    }

    /// Guarded clear-and-type; `true` when the text was entered
    ///
    /// # Errors
    ///
    /// Returns an error on hard driver failures.
    pub async fn type_text(&self, locator: &Locator, text: &str) -> PaseoResult<bool> {
        self.guard.type_text(self.driver(), locator, text).await
    }

    /// Click the first actionable of possibly many matches
    ///
    /// # Errors
    ///
    /// Returns an error on hard driver failures.
    pub async fn click_first_actionable(
        &self,
        locator: &Locator,
        max_attempts: u32,
    ) -> PaseoResult<bool> {
        self.guard
            .click_first_actionable(self.driver(), locator, max_attempts)
            .await
    }

    /// Scroll down `times` swipe gestures
    ///
    /// # Errors
    ///
    /// Returns an error if script evaluation fails.
    pub async fn swipe_down(&self, times: u32) -> PaseoResult<()> {
        self.guard
            .swipe_down(self.driver(), times, &self.scroll)
            .await
    }

    /// Resolve a blocking popup
    ///
    /// # Errors
    ///
    /// Returns an error on hard driver failures.
    pub async fn resolve_popup(
        &self,
        popup: &Locator,
        accept: &Locator,
    ) -> PaseoResult<PopupOutcome> {
        self.popups.resolve(self.session, popup, accept).await
    }

    /// Accept a one-off overlay control if present
    ///
    /// # Errors
    ///
    /// Returns an error on hard driver failures.
    pub async fn accept_gate(&self, accept: &Locator) -> PaseoResult<bool> {
        self.popups.accept_if_present(self.session, accept).await
    }

    /// Verify the session is on page `P`: URL pattern plus ready
    /// marker when the page declares one.
    ///
    /// # Errors
    ///
    /// Returns [`PaseoError::AssertionFailed`] naming the page when
    /// either check fails.
    pub async fn ensure_on<P: PageObject>(&self) -> PaseoResult<()> {
        let pattern = P::url_pattern();
        let url = self.driver().current_url().await?;
        if !pattern.matches(&url) {
            return Err(PaseoError::assertion(format!(
                "expected to be on {} (URL {pattern}), got '{url}'",
                P::page_name()
            )));
        }
        if let Some(marker) = P::ready_marker() {
            // The page's own budget, capped by the configured wait
            let waits = WaitOptions {
                timeout: P::load_timeout().min(self.waits.timeout),
                poll_interval: self.waits.poll_interval,
            };
            assertion::assert_element_visible(
                self.driver(),
                &marker,
                &waits,
                Some(P::page_name()),
            )
            .await?;
        }
        debug!(page = P::page_name(), url = %url, "page verified");
        Ok(())
    }

    /// Assert the current URL contains a fragment
    ///
    /// # Errors
    ///
    /// Returns [`PaseoError::AssertionFailed`] when absent.
    pub async fn assert_url_contains(&self, fragment: &str, message: Option<&str>) -> PaseoResult<()> {
        assertion::assert_url_contains(self.driver(), fragment, message).await
    }

    /// Assert an element becomes visible within the wait budget
    ///
    /// # Errors
    ///
    /// Returns [`PaseoError::AssertionFailed`] at the bound.
    pub async fn assert_visible(&self, locator: &Locator, message: Option<&str>) -> PaseoResult<()> {
        assertion::assert_element_visible(self.driver(), locator, &self.waits, message).await
    }

    /// Assert no match for the locator is currently visible
    ///
    /// # Errors
    ///
    /// Returns [`PaseoError::AssertionFailed`] when one is.
    pub async fn assert_not_visible(
        &self,
        locator: &Locator,
        message: Option<&str>,
    ) -> PaseoResult<()> {
        assertion::assert_element_not_visible(self.driver(), locator, message).await
    }

    /// Assert at least `minimum` matches; returns the observed count
    ///
    /// # Errors
    ///
    /// Returns [`PaseoError::AssertionFailed`] when short.
    pub async fn assert_count_at_least(
        &self,
        locator: &Locator,
        minimum: usize,
        message: Option<&str>,
    ) -> PaseoResult<usize> {
        assertion::assert_element_count_at_least(self.driver(), locator, minimum, &self.waits, message)
            .await
    }

    /// Assert the current URL has at least `depth` non-empty segments
    ///
    /// # Errors
    ///
    /// Returns [`PaseoError::AssertionFailed`] when shallower.
    pub async fn assert_url_depth_at_least(
        &self,
        depth: usize,
        message: Option<&str>,
    ) -> PaseoResult<()> {
        assertion::assert_url_path_depth_at_least(self.driver(), depth, message).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::testkit::{FakeDriver, FakeElementSpec};

    struct DirectoryPage;

    impl PageObject for DirectoryPage {
        fn url_pattern() -> UrlPattern {
            UrlPattern::Contains("/directory".into())
        }

        fn ready_marker() -> Option<Locator> {
            Some(Locator::css("article a[href$='/home'].tw-link"))
        }

        fn load_timeout() -> Duration {
            Duration::from_millis(100)
        }
    }

    fn fast_config() -> SuiteConfig {
        let mut config = SuiteConfig::default();
        config.timeouts.wait_ms = 100;
        config.timeouts.stability_ms = 100;
        config.timeouts.poll_ms = 5;
        config.timeouts.ready_state_ms = 50;
        config.timeouts.skeleton_ms = 20;
        config.timeouts.popup_ms = 50;
        config.timeouts.popup_dismiss_ms = 50;
        config
    }

    #[test]
    fn test_page_name_strips_module_path() {
        assert_eq!(DirectoryPage::page_name(), "DirectoryPage");
    }

    #[tokio::test]
    async fn test_open_navigates_and_captures() {
        let driver = FakeDriver::new("about:blank");
        driver.push_fingerprints(&[10]);
        let root = tempfile::tempdir().unwrap();
        let session = Session::new(driver.clone(), root.path()).unwrap();
        let page = Page::from_config(&session, &fast_config());

        page.open("https://m.twitch.tv/").await.unwrap();
        assert_eq!(driver.current_url_sync(), "https://m.twitch.tv/");
        assert_eq!(session.artifacts().len(), 1);
        session.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_ensure_on_checks_url_and_marker() {
        let driver = FakeDriver::new("https://m.twitch.tv/directory/category/starcraft-ii");
        let marker = Locator::css("article a[href$='/home'].tw-link");
        driver.insert_element(&marker, FakeElementSpec::new());
        let root = tempfile::tempdir().unwrap();
        let session = Session::new(driver, root.path()).unwrap();
        let page = Page::from_config(&session, &fast_config());

        page.ensure_on::<DirectoryPage>().await.unwrap();
        session.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_ensure_on_fails_off_page() {
        let driver = FakeDriver::new("https://m.twitch.tv/");
        let root = tempfile::tempdir().unwrap();
        let session = Session::new(driver, root.path()).unwrap();
        let page = Page::from_config(&session, &fast_config());

        let err = page.ensure_on::<DirectoryPage>().await.unwrap_err();
        assert!(err.to_string().contains("DirectoryPage"));
        session.close().await.unwrap();
    }
}
