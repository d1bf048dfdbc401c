//! Page stability detection.
//!
//! Mobile web apps load asynchronously behind skeleton placeholders, so
//! no single "loaded" event is reliable. Stability is instead inferred
//! from the absence of change: a cheap fingerprint of the rendered body
//! is polled on a fixed interval, and the page counts as loaded once
//! the fingerprint has held steady for a required number of
//! consecutive polls.
//!
//! The fingerprint is the byte length of `document.body.innerHTML`. A
//! length-stable page can still be visually loading images; a
//! structural hash would be stronger but changes observable timing, so
//! the tracker is fingerprint-agnostic (`u64`) and the default stays
//! length-based.

use std::time::Duration;
use tracing::{debug, info, warn};

use crate::driver::{Driver, Element};
use crate::locator::Locator;
use crate::result::PaseoResult;
use crate::wait::Deadline;

/// Expression returning the current page-content fingerprint
pub(crate) const FINGERPRINT_SCRIPT: &str = "document.body ? document.body.innerHTML.length : 0";

/// Expression returning the document ready state
pub(crate) const READY_STATE_SCRIPT: &str = "document.readyState";

/// Options controlling one stability wait
#[derive(Debug, Clone)]
pub struct StabilityOptions {
    /// Upper bound on the whole wait
    pub timeout: Duration,
    /// Fixed interval between fingerprint polls
    pub poll_interval: Duration,
    /// Consecutive unchanged polls required to call the page stable
    pub required_stable_polls: u32,
    /// Bounded pre-wait for `document.readyState == "complete"`
    pub ready_state_timeout: Duration,
    /// Short post-check that skeleton markers have gone
    pub skeleton_timeout: Duration,
    /// Markers whose presence means content has rendered (fast path)
    pub content_markers: Vec<Locator>,
    /// Markers that indicate the page is still loading
    pub skeleton_markers: Vec<Locator>,
}

impl Default for StabilityOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(15),
            poll_interval: Duration::from_millis(500),
            required_stable_polls: 3,
            ready_state_timeout: Duration::from_secs(5),
            skeleton_timeout: Duration::from_secs(2),
            content_markers: Vec::new(),
            skeleton_markers: Vec::new(),
        }
    }
}

impl StabilityOptions {
    /// Create options with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the overall timeout
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the polling interval
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Set the required consecutive stable polls
    #[must_use]
    pub const fn with_required_stable_polls(mut self, polls: u32) -> Self {
        self.required_stable_polls = polls;
        self
    }

    /// Set the content markers used for the fast path
    #[must_use]
    pub fn with_content_markers(mut self, markers: Vec<Locator>) -> Self {
        self.content_markers = markers;
        self
    }

    /// Set the skeleton markers
    #[must_use]
    pub fn with_skeleton_markers(mut self, markers: Vec<Locator>) -> Self {
        self.skeleton_markers = markers;
        self
    }
}

/// Consecutive-equal-fingerprint counter.
///
/// Lifecycle is scoped to one stability wait: the counter resets to
/// zero whenever the fingerprint changes and reaches the threshold
/// only after that many consecutive unchanged readings.
#[derive(Debug, Clone)]
pub struct StabilityTracker {
    last: Option<u64>,
    streak: u32,
    required: u32,
}

impl StabilityTracker {
    /// Create a tracker requiring `required` consecutive stable polls
    #[must_use]
    pub const fn new(required: u32) -> Self {
        Self {
            last: None,
            streak: 0,
            required,
        }
    }

    /// Record one fingerprint reading; returns true once stable.
    ///
    /// The first reading establishes a baseline and never counts
    /// toward the streak.
    pub fn observe(&mut self, fingerprint: u64) -> bool {
        match self.last {
            Some(previous) if previous == fingerprint => self.streak += 1,
            _ => self.streak = 0,
        }
        self.last = Some(fingerprint);
        self.streak >= self.required
    }

    /// Current streak of unchanged readings
    #[must_use]
    pub const fn streak(&self) -> u32 {
        self.streak
    }

    /// Reset to the initial state
    pub fn reset(&mut self) {
        self.last = None;
        self.streak = 0;
    }
}

/// Decides when a page has finished rendering.
#[derive(Debug, Clone, Default)]
pub struct StabilityDetector {
    options: StabilityOptions,
}

impl StabilityDetector {
    /// Create a detector with the given options
    #[must_use]
    pub const fn new(options: StabilityOptions) -> Self {
        Self { options }
    }

    /// The detector's options
    #[must_use]
    pub const fn options(&self) -> &StabilityOptions {
        &self.options
    }

    /// Wait until the page has settled.
    ///
    /// Returns `Ok(true)` once a content marker is present (fast path)
    /// or the fingerprint has been stable for the required number of
    /// consecutive polls. A page that never stops mutating yields
    /// `Ok(false)` at the timeout bound; the timeout is a logged
    /// warning, not an error, because an overly strict wait causes
    /// more flakiness than it prevents.
    ///
    /// # Errors
    ///
    /// Returns an error only for hard driver failures (protocol error,
    /// browser gone); transient conditions never surface here.
    pub async fn wait_until_stable<D: Driver>(&self, driver: &D) -> PaseoResult<bool> {
        self.await_document_ready(driver).await?;

        let mut tracker = StabilityTracker::new(self.options.required_stable_polls);
        let deadline = Deadline::after(self.options.timeout);

        loop {
            if self.content_marker_present(driver).await? {
                debug!("content marker present; page considered loaded");
                return Ok(true);
            }

            let fingerprint = self.fingerprint(driver).await?;
            if tracker.observe(fingerprint) {
                self.await_skeletons_gone(driver).await?;
                info!(
                    elapsed_ms = deadline.elapsed().as_millis() as u64,
                    "page stable"
                );
                return Ok(true);
            }

            if deadline.expired() {
                warn!(
                    timeout_ms = self.options.timeout.as_millis() as u64,
                    streak = tracker.streak(),
                    "page did not stabilize; proceeding anyway"
                );
                return Ok(false);
            }
            tokio::time::sleep(self.options.poll_interval).await;
        }
    }

    /// Read the current content fingerprint
    async fn fingerprint<D: Driver>(&self, driver: &D) -> PaseoResult<u64> {
        let value = driver.execute_script(FINGERPRINT_SCRIPT, Vec::new()).await?;
        Ok(value.as_u64().unwrap_or(0))
    }

    /// Bounded soft wait for `document.readyState == "complete"`
    async fn await_document_ready<D: Driver>(&self, driver: &D) -> PaseoResult<()> {
        let deadline = Deadline::after(self.options.ready_state_timeout);
        loop {
            let state = driver.execute_script(READY_STATE_SCRIPT, Vec::new()).await?;
            if state.as_str() == Some("complete") {
                debug!("document ready state: complete");
                return Ok(());
            }
            if deadline.expired() {
                warn!("document ready state timeout; proceeding anyway");
                return Ok(());
            }
            tokio::time::sleep(self.options.poll_interval).await;
        }
    }

    /// Whether any configured content marker is present in the DOM
    async fn content_marker_present<D: Driver>(&self, driver: &D) -> PaseoResult<bool> {
        for marker in &self.options.content_markers {
            if !driver.find_elements(marker).await?.is_empty() {
                debug!(marker = %marker, "content marker found");
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Short soft wait for all skeleton markers to stop being visible.
    ///
    /// Skeletons might not exist on every page; absence is success.
    async fn await_skeletons_gone<D: Driver>(&self, driver: &D) -> PaseoResult<()> {
        if self.options.skeleton_markers.is_empty() {
            return Ok(());
        }
        let deadline = Deadline::after(self.options.skeleton_timeout);
        loop {
            if !self.any_skeleton_visible(driver).await? {
                return Ok(());
            }
            if deadline.expired() {
                debug!("skeleton markers still visible at timeout; proceeding");
                return Ok(());
            }
            tokio::time::sleep(self.options.poll_interval).await;
        }
    }

    async fn any_skeleton_visible<D: Driver>(&self, driver: &D) -> PaseoResult<bool> {
        for marker in &self.options.skeleton_markers {
            for element in driver.find_elements(marker).await? {
                // A handle going stale here means the skeleton left the DOM
                match element.is_displayed().await {
                    Ok(true) => return Ok(true),
                    Ok(false) => {}
                    Err(e) if e.is_recoverable() => {}
                    Err(e) => return Err(e),
                }
            }
        }
        Ok(false)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::testkit::{FakeDriver, FakeElementSpec};
    use std::time::Instant;

    fn fast_options() -> StabilityOptions {
        let mut options = StabilityOptions::new()
            .with_timeout(Duration::from_millis(200))
            .with_poll_interval(Duration::from_millis(5))
            .with_required_stable_polls(3);
        options.ready_state_timeout = Duration::from_millis(50);
        options.skeleton_timeout = Duration::from_millis(30);
        options
    }

    mod tracker_tests {
        use super::*;

        #[test]
        fn test_first_reading_is_baseline_only() {
            let mut tracker = StabilityTracker::new(1);
            assert!(!tracker.observe(100));
            assert_eq!(tracker.streak(), 0);
        }

        #[test]
        fn test_streak_counts_consecutive_equal_readings() {
            let mut tracker = StabilityTracker::new(3);
            assert!(!tracker.observe(7));
            assert!(!tracker.observe(7));
            assert!(!tracker.observe(7));
            assert!(tracker.observe(7));
        }

        #[test]
        fn test_change_resets_streak_to_zero() {
            // [A, A, B, B, B, B] with threshold 3 succeeds only on the 4th B
            let mut tracker = StabilityTracker::new(3);
            let results: Vec<bool> = [10, 10, 20, 20, 20, 20]
                .iter()
                .map(|fp| tracker.observe(*fp))
                .collect();
            assert_eq!(results, vec![false, false, false, false, false, true]);
        }

        #[test]
        fn test_reset_clears_baseline() {
            let mut tracker = StabilityTracker::new(1);
            tracker.observe(5);
            tracker.observe(5);
            assert_eq!(tracker.streak(), 1);
            tracker.reset();
            assert!(!tracker.observe(5));
            assert_eq!(tracker.streak(), 0);
        }

        #[test]
        fn test_zero_threshold_is_stable_after_baseline() {
            let mut tracker = StabilityTracker::new(0);
            assert!(tracker.observe(1));
        }
    }

    mod detector_tests {
        use super::*;

        #[tokio::test]
        async fn test_stable_fingerprint_succeeds() {
            let driver = FakeDriver::new("https://m.twitch.tv/");
            driver.push_fingerprints(&[100]);
            let detector = StabilityDetector::new(fast_options());
            assert!(detector.wait_until_stable(&driver).await.unwrap());
        }

        #[tokio::test]
        async fn test_ever_changing_page_returns_false_at_timeout() {
            let driver = FakeDriver::new("https://m.twitch.tv/");
            driver.set_fingerprint_counter();
            let detector = StabilityDetector::new(fast_options());
            let started = Instant::now();
            assert!(!detector.wait_until_stable(&driver).await.unwrap());
            // returns within timeout + one poll interval
            assert!(started.elapsed() < Duration::from_millis(300));
        }

        #[tokio::test]
        async fn test_content_marker_fast_path() {
            let driver = FakeDriver::new("https://m.twitch.tv/");
            driver.set_fingerprint_counter();
            let marker = Locator::css(".tw-card");
            driver.insert_element(&marker, FakeElementSpec::new());
            let options = fast_options().with_content_markers(vec![marker]);
            let detector = StabilityDetector::new(options);
            // fast path succeeds even though the fingerprint never settles
            assert!(detector.wait_until_stable(&driver).await.unwrap());
        }

        #[tokio::test]
        async fn test_visible_skeleton_delays_but_never_fails() {
            let driver = FakeDriver::new("https://m.twitch.tv/");
            driver.push_fingerprints(&[42]);
            let skeleton = Locator::css("[class*=\"skeleton\"]");
            driver.insert_element(&skeleton, FakeElementSpec::new());
            let options = fast_options().with_skeleton_markers(vec![skeleton]);
            let detector = StabilityDetector::new(options);
            assert!(detector.wait_until_stable(&driver).await.unwrap());
        }
    }
}
