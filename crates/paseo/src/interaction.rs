//! Soft-fail interaction guard.
//!
//! Optional UI (popups, banners, suggestion lists) comes and goes on
//! its own schedule, so blind clicks are the main source of flaky
//! runs. The guard waits for a target to become actionable before
//! touching it, and degrades to a logged skip when the target never
//! shows up. Hard driver failures still propagate; only element-level
//! conditions are absorbed.

use std::time::Duration;
use tracing::{debug, warn};

use crate::driver::{Driver, Element};
use crate::locator::Locator;
use crate::result::{PaseoError, PaseoResult};
use crate::wait::{Deadline, WaitOptions};

/// Scroll gesture parameters
#[derive(Debug, Clone)]
pub struct ScrollOptions {
    /// Pixels scrolled per step
    pub step_px: u32,
    /// Steps per swipe gesture
    pub steps_per_swipe: u32,
    /// Pause between steps
    pub step_delay: Duration,
    /// Pause after a full swipe, letting lazy content load
    pub settle: Duration,
}

impl Default for ScrollOptions {
    fn default() -> Self {
        Self {
            step_px: 80,
            steps_per_swipe: 10,
            step_delay: Duration::from_millis(50),
            settle: Duration::from_millis(300),
        }
    }
}

/// Guarded element interactions with soft-fail semantics.
///
/// `click` and `type_text` return a `bool` rather than an error when
/// the target is simply not there: absence of optional UI is an
/// expected outcome, not a failure. Callers that require the
/// interaction to have happened assert on the returned flag.
#[derive(Debug, Clone, Default)]
pub struct InteractionGuard {
    options: WaitOptions,
}

impl InteractionGuard {
    /// Create a guard with the given wait options
    #[must_use]
    pub const fn new(options: WaitOptions) -> Self {
        Self { options }
    }

    /// Wait for the first actionable match and click it.
    ///
    /// Returns `true` if a click landed, `false` if no actionable
    /// match appeared within the wait budget or the click itself hit a
    /// recoverable condition.
    ///
    /// # Errors
    ///
    /// Returns an error only on hard driver failures.
    pub async fn click<D: Driver>(&self, driver: &D, locator: &Locator) -> PaseoResult<bool> {
        let Some(element) = self.await_actionable(driver, locator, true).await? else {
            debug!(target = %locator, "click target never became actionable; skipping");
            return Ok(false);
        };
        match element.click().await {
            Ok(()) => {
                debug!(target = %locator, "clicked");
                Ok(true)
            }
            Err(e) if e.is_recoverable() => {
                warn!(target = %locator, error = %e, "click failed on transient condition; skipping");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Wait for the first actionable match, clear it, and type into it.
    ///
    /// Same soft-fail contract as [`click`](Self::click).
    ///
    /// # Errors
    ///
    /// Returns an error only on hard driver failures.
    pub async fn type_text<D: Driver>(
        &self,
        driver: &D,
        locator: &Locator,
        text: &str,
    ) -> PaseoResult<bool> {
        let Some(element) = self.await_actionable(driver, locator, true).await? else {
            debug!(target = %locator, "input never became actionable; skipping");
            return Ok(false);
        };
        let typed = async {
            element.clear().await?;
            element.send_keys(text).await
        }
        .await;
        match typed {
            Ok(()) => {
                debug!(target = %locator, "typed text");
                Ok(true)
            }
            Err(e) if e.is_recoverable() => {
                warn!(target = %locator, error = %e, "typing failed on transient condition; skipping");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Click the first of possibly many matches that is actually
    /// actionable, retrying across candidates.
    ///
    /// Unlike [`click`](Self::click) this iterates the full match list
    /// each attempt and moves on to the next candidate when a click
    /// hits a recoverable condition. Used where any one of a set of
    /// equivalent targets will do (e.g. picking a card from a grid).
    ///
    /// Returns `Ok(true)` once a click lands, `Ok(false)` when all
    /// attempts are exhausted.
    ///
    /// # Errors
    ///
    /// Returns an error only on hard driver failures.
    pub async fn click_first_actionable<D: Driver>(
        &self,
        driver: &D,
        locator: &Locator,
        max_attempts: u32,
    ) -> PaseoResult<bool> {
        for attempt in 1..=max_attempts {
            let candidates = driver.find_elements(locator).await?;
            for element in candidates {
                if !Self::is_actionable(&element, false).await? {
                    continue;
                }
                match element.click().await {
                    Ok(()) => {
                        debug!(target = %locator, attempt, "clicked candidate");
                        return Ok(true);
                    }
                    Err(e) if e.is_recoverable() => {
                        debug!(target = %locator, error = %e, "candidate click failed; trying next");
                    }
                    Err(e) => return Err(e),
                }
            }
            if attempt < max_attempts {
                tokio::time::sleep(self.options.poll_interval).await;
            }
        }
        warn!(target = %locator, max_attempts, "no candidate accepted a click");
        Ok(false)
    }

    /// Scroll the page down `times` swipes.
    ///
    /// Each swipe is a run of small `scrollBy` steps followed by a
    /// settle pause, approximating a finger drag closely enough that
    /// lazy-loading triggers.
    ///
    /// # Errors
    ///
    /// Returns an error if script evaluation fails.
    pub async fn swipe_down<D: Driver>(
        &self,
        driver: &D,
        times: u32,
        scroll: &ScrollOptions,
    ) -> PaseoResult<()> {
        for swipe in 1..=times {
            for _ in 0..scroll.steps_per_swipe {
                driver
                    .execute_script(
                        &format!("window.scrollBy(0, {})", scroll.step_px),
                        Vec::new(),
                    )
                    .await?;
                tokio::time::sleep(scroll.step_delay).await;
            }
            debug!(swipe, "swipe complete");
            tokio::time::sleep(scroll.settle).await;
        }
        Ok(())
    }

    /// Poll until a match is displayed, in viewport, and (optionally)
    /// enabled. Returns `None` at the wait bound.
    async fn await_actionable<D: Driver>(
        &self,
        driver: &D,
        locator: &Locator,
        require_enabled: bool,
    ) -> PaseoResult<Option<D::Element>> {
        let deadline = Deadline::after(self.options.timeout);
        loop {
            if let Some(element) = first_actionable(driver, locator, require_enabled).await? {
                return Ok(Some(element));
            }
            if deadline.expired() {
                return Ok(None);
            }
            tokio::time::sleep(self.options.poll_interval).await;
        }
    }

    async fn is_actionable<E: Element>(element: &E, require_enabled: bool) -> PaseoResult<bool> {
        let checks = async {
            let displayed = element.is_displayed().await?;
            let in_view = element.in_viewport().await?;
            let enabled = !require_enabled || element.is_enabled().await?;
            Ok::<_, PaseoError>(displayed && in_view && enabled)
        };
        match checks.await {
            Ok(actionable) => Ok(actionable),
            // A handle that went stale mid-check is just not actionable
            Err(e) if e.is_recoverable() => Ok(false),
            Err(e) => Err(e),
        }
    }
}

/// First match that passes the actionability checks, if any.
///
/// Per-element recoverable errors (stale handles from a concurrent
/// re-render) skip that element rather than aborting the scan.
pub(crate) async fn first_actionable<D: Driver>(
    driver: &D,
    locator: &Locator,
    require_enabled: bool,
) -> PaseoResult<Option<D::Element>> {
    for element in driver.find_elements(locator).await? {
        if InteractionGuard::is_actionable(&element, require_enabled).await? {
            return Ok(Some(element));
        }
    }
    Ok(None)
}
