//! Popup and consent-banner resolution.
//!
//! Overlays (cookie consent, content gates) appear on their own
//! schedule and block everything underneath, so every scenario
//! resolves them before interacting with the page proper. Resolution
//! is a short two-phase wait: first for the overlay's accept control
//! to show up, then for the overlay to actually leave after one click.

use std::time::Duration;
use tracing::{debug, error, info};

use crate::driver::{Driver, Element};
use crate::interaction::first_actionable;
use crate::locator::Locator;
use crate::result::PaseoResult;
use crate::session::{Checkpoint, Session};
use crate::wait::Deadline;

/// How a popup resolution attempt concluded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopupOutcome {
    /// The popup never appeared within the detection window
    Absent,
    /// The popup appeared and was dismissed
    Dismissed,
    /// The popup was clicked but did not go away
    Stuck,
}

impl PopupOutcome {
    /// Whether a dismissal click landed and took effect
    #[must_use]
    pub const fn was_dismissed(&self) -> bool {
        matches!(self, Self::Dismissed)
    }
}

/// Options controlling popup resolution
#[derive(Debug, Clone)]
pub struct PopupOptions {
    /// How long to watch for the popup to appear
    pub timeout: Duration,
    /// How long to wait for the popup to leave after the click
    pub dismiss_timeout: Duration,
    /// Polling interval for both phases
    pub poll_interval: Duration,
}

impl Default for PopupOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(3),
            dismiss_timeout: Duration::from_secs(5),
            poll_interval: Duration::from_millis(250),
        }
    }
}

impl PopupOptions {
    /// Create options with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the detection window
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the post-click dismissal wait
    #[must_use]
    pub const fn with_dismiss_timeout(mut self, timeout: Duration) -> Self {
        self.dismiss_timeout = timeout;
        self
    }

    /// Set the polling interval
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }
}

/// Resolves blocking overlays before page interaction proceeds.
#[derive(Debug, Clone, Default)]
pub struct PopupResolver {
    options: PopupOptions,
}

impl PopupResolver {
    /// Create a resolver with the given options
    #[must_use]
    pub const fn new(options: PopupOptions) -> Self {
        Self { options }
    }

    /// Resolve one popup: wait for its accept control, click it once,
    /// then wait for the popup container to leave.
    ///
    /// `popup` locates the overlay container; `accept` locates the
    /// control that dismisses it. At most one dismissal click is
    /// issued, with a single fresh re-query if the first handle went
    /// stale. A popup that never appears yields
    /// [`PopupOutcome::Absent`]; one that survives the click yields
    /// [`PopupOutcome::Stuck`] with a diagnostic screenshot, and the
    /// caller decides whether that is fatal.
    ///
    /// # Errors
    ///
    /// Returns an error only on hard driver failures.
    pub async fn resolve<D: Driver>(
        &self,
        session: &Session<D>,
        popup: &Locator,
        accept: &Locator,
    ) -> PaseoResult<PopupOutcome> {
        let driver = session.driver();

        let Some(control) = self.await_accept_control(driver, accept).await? else {
            debug!(popup = %popup, "popup never appeared");
            return Ok(PopupOutcome::Absent);
        };

        if !self.click_once(driver, accept, control).await? {
            // The control vanished between query and click; treat the
            // popup as gone and let phase two confirm.
            debug!(popup = %popup, "accept control vanished before click");
        }

        if self.await_popup_gone(driver, popup).await? {
            info!(popup = %popup, "popup dismissed");
            return Ok(PopupOutcome::Dismissed);
        }

        error!(popup = %popup, "popup still present after dismissal click");
        if let Err(e) = session.capture(Checkpoint::PopupStuck).await {
            error!(error = %e, "failed to capture stuck-popup screenshot");
        }
        Ok(PopupOutcome::Stuck)
    }

    /// Click an optional one-off overlay control if it is present.
    ///
    /// Lighter than [`resolve`](Self::resolve): no container tracking
    /// and no dismissal verification. Used for gates that replace
    /// their own content when accepted (e.g. a mature-content
    /// interstitial).
    ///
    /// # Errors
    ///
    /// Returns an error only on hard driver failures.
    pub async fn accept_if_present<D: Driver>(
        &self,
        session: &Session<D>,
        accept: &Locator,
    ) -> PaseoResult<bool> {
        let driver = session.driver();
        let Some(control) = self.await_accept_control(driver, accept).await? else {
            return Ok(false);
        };
        let clicked = self.click_once(driver, accept, control).await?;
        if clicked {
            info!(control = %accept, "gate accepted");
        }
        Ok(clicked)
    }

    /// Phase one: bounded wait for the accept control to be actionable
    async fn await_accept_control<D: Driver>(
        &self,
        driver: &D,
        accept: &Locator,
    ) -> PaseoResult<Option<D::Element>> {
        let deadline = Deadline::after(self.options.timeout);
        loop {
            if let Some(element) = first_actionable(driver, accept, true).await? {
                return Ok(Some(element));
            }
            if deadline.expired() {
                return Ok(None);
            }
            tokio::time::sleep(self.options.poll_interval).await;
        }
    }

    /// Issue the single dismissal click, with one fresh re-query if
    /// the handle went stale underneath us.
    async fn click_once<D: Driver>(
        &self,
        driver: &D,
        accept: &Locator,
        control: D::Element,
    ) -> PaseoResult<bool> {
        match control.click().await {
            Ok(()) => return Ok(true),
            Err(e) if e.is_recoverable() => {
                debug!(control = %accept, error = %e, "dismissal click failed; re-querying once");
            }
            Err(e) => return Err(e),
        }
        match first_actionable(driver, accept, true).await? {
            Some(fresh) => match fresh.click().await {
                Ok(()) => Ok(true),
                Err(e) if e.is_recoverable() => Ok(false),
                Err(e) => Err(e),
            },
            None => Ok(false),
        }
    }

    /// Phase two: bounded wait for the popup container to disappear
    async fn await_popup_gone<D: Driver>(&self, driver: &D, popup: &Locator) -> PaseoResult<bool> {
        let deadline = Deadline::after(self.options.dismiss_timeout);
        loop {
            if !self.popup_visible(driver, popup).await? {
                return Ok(true);
            }
            if deadline.expired() {
                return Ok(false);
            }
            tokio::time::sleep(self.options.poll_interval).await;
        }
    }

    async fn popup_visible<D: Driver>(&self, driver: &D, popup: &Locator) -> PaseoResult<bool> {
        for element in driver.find_elements(popup).await? {
            match element.is_displayed().await {
                Ok(true) => return Ok(true),
                Ok(false) => {}
                // Stale handle means the popup left the DOM
                Err(e) if e.is_recoverable() => {}
                Err(e) => return Err(e),
            }
        }
        Ok(false)
    }
}
