//! Suite configuration.
//!
//! Every environment-dependent value lives here: base URL, device
//! profile, timeouts, scroll tuning, and the full selector set. The
//! defaults target the Twitch mobile site; a JSON file can override
//! any subset of fields.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::interaction::ScrollOptions;
use crate::locator::Locator;
use crate::popup::PopupOptions;
use crate::stability::StabilityOptions;
use crate::wait::WaitOptions;

/// Mobile device emulation parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceProfile {
    /// Human-readable device name
    pub name: String,
    /// Viewport width in CSS pixels
    pub viewport_width: u32,
    /// Viewport height in CSS pixels
    pub viewport_height: u32,
    /// User agent string
    pub user_agent: String,
}

impl Default for DeviceProfile {
    fn default() -> Self {
        Self {
            name: "iPhone 14 Pro Max".to_string(),
            viewport_width: 430,
            viewport_height: 932,
            user_agent: "Mozilla/5.0 (iPhone; CPU iPhone OS 16_6 like Mac OS X) \
                         AppleWebKit/605.1.15 (KHTML, like Gecko) Version/16.6 \
                         Mobile/15E148 Safari/604.1"
                .to_string(),
        }
    }
}

impl DeviceProfile {
    /// Browser launch options emulating this device
    #[must_use]
    pub fn browser_options(&self) -> crate::driver::BrowserOptions {
        crate::driver::BrowserOptions::default()
            .with_viewport(self.viewport_width, self.viewport_height)
            .with_user_agent(self.user_agent.clone())
    }
}

/// All timeouts, in milliseconds for easy JSON overriding
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Default element wait
    pub wait_ms: u64,
    /// Page stability wait
    pub stability_ms: u64,
    /// Polling interval for element and stability waits
    pub poll_ms: u64,
    /// Document ready-state pre-wait
    pub ready_state_ms: u64,
    /// Skeleton-gone post-check
    pub skeleton_ms: u64,
    /// Popup detection window
    pub popup_ms: u64,
    /// Popup post-click dismissal wait
    pub popup_dismiss_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            wait_ms: 10_000,
            stability_ms: 15_000,
            poll_ms: 500,
            ready_state_ms: 5_000,
            skeleton_ms: 2_000,
            popup_ms: 3_000,
            popup_dismiss_ms: 5_000,
        }
    }
}

/// Scroll gesture tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrollConfig {
    /// Number of swipe gestures
    pub times: u32,
    /// Pixels per scroll step
    pub step_px: u32,
    /// Scroll steps per swipe
    pub steps_per_swipe: u32,
    /// Delay between steps, milliseconds
    pub step_delay_ms: u64,
    /// Settle pause after each swipe, milliseconds
    pub settle_ms: u64,
}

impl Default for ScrollConfig {
    fn default() -> Self {
        Self {
            times: 2,
            step_px: 80,
            steps_per_swipe: 10,
            step_delay_ms: 50,
            settle_ms: 300,
        }
    }
}

/// The selector repository, separated from scenario logic so markup
/// churn lands in one place.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorSet {
    /// Link that opens the search/browse surface
    pub search_icon: Locator,
    /// Search text input
    pub search_input: Locator,
    /// Category suggestion entries under the search input
    pub search_suggestion: Locator,
    /// Channel cards in a category grid
    pub streamer_card: Locator,
    /// Cookie consent banner container
    pub cookie_banner: Locator,
    /// Cookie consent accept button
    pub cookie_accept: Locator,
    /// Mature-content gate confirmation button
    pub mature_gate: Locator,
    /// Presence of any of these means content has rendered
    pub content_markers: Vec<Locator>,
    /// Presence of any of these means the page is still loading
    pub skeleton_markers: Vec<Locator>,
}

impl Default for SelectorSet {
    fn default() -> Self {
        Self {
            search_icon: Locator::css("a[href=\"/directory\"]"),
            search_input: Locator::css("input[data-a-target=\"tw-input\"]"),
            search_suggestion: Locator::css("a[href^=\"/directory/category\"]"),
            streamer_card: Locator::css("article a[href$='/home'].tw-link"),
            cookie_banner: Locator::css("div[data-a-target=\"consent-banner\"]"),
            cookie_accept: Locator::css("button[data-a-target=\"consent-banner-accept\"]"),
            mature_gate: Locator::css(
                "button[data-a-target=\"content-classification-gate-overlay-start-watching-button\"]",
            ),
            content_markers: vec![
                Locator::css("[data-a-target=\"tw-core-button-label-text\"]"),
                Locator::css(".tw-card"),
                Locator::css(".ScCoreLink-sc-16kq0mq-0"),
                Locator::css("img[src*=\"static-cdn.jtvnw.net\"]"),
            ],
            skeleton_markers: vec![
                Locator::css("[class*=\"skeleton\"]"),
                Locator::css("[class*=\"loading\"]"),
                Locator::css("[class*=\"ScSkeletonWrapper\"]"),
                Locator::css(".tw-skeleton"),
                Locator::css("[aria-label*=\"Loading\"]"),
                Locator::css("[data-a-target*=\"loading\"]"),
            ],
        }
    }
}

/// Top-level suite configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SuiteConfig {
    /// Site entry point
    pub base_url: String,
    /// Fragment every in-site URL must contain
    pub domain_fragment: String,
    /// Search query driven through the journey
    pub search_term: String,
    /// Device emulation
    pub device: DeviceProfile,
    /// Timeouts
    pub timeouts: TimeoutConfig,
    /// Scroll tuning
    pub scroll: ScrollConfig,
    /// Candidate-retry bound when selecting a streamer
    pub streamer_attempts: u32,
    /// Root directory for screenshot artifacts
    pub artifact_dir: String,
    /// Selector repository
    pub selectors: SelectorSet,
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            base_url: "https://m.twitch.tv/".to_string(),
            domain_fragment: "twitch.tv".to_string(),
            search_term: "StarCraft II".to_string(),
            device: DeviceProfile::default(),
            timeouts: TimeoutConfig::default(),
            scroll: ScrollConfig::default(),
            streamer_attempts: 5,
            artifact_dir: "artifacts".to_string(),
            selectors: SelectorSet::default(),
        }
    }
}

impl SuiteConfig {
    /// Load configuration from a JSON file; absent fields keep their
    /// defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_json_file(path: impl AsRef<Path>) -> crate::PaseoResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Wait options derived from the timeout table
    #[must_use]
    pub const fn wait_options(&self) -> WaitOptions {
        WaitOptions {
            timeout: Duration::from_millis(self.timeouts.wait_ms),
            poll_interval: Duration::from_millis(self.timeouts.poll_ms),
        }
    }

    /// Stability options derived from timeouts and selectors
    #[must_use]
    pub fn stability_options(&self) -> StabilityOptions {
        StabilityOptions {
            timeout: Duration::from_millis(self.timeouts.stability_ms),
            poll_interval: Duration::from_millis(self.timeouts.poll_ms),
            required_stable_polls: 3,
            ready_state_timeout: Duration::from_millis(self.timeouts.ready_state_ms),
            skeleton_timeout: Duration::from_millis(self.timeouts.skeleton_ms),
            content_markers: self.selectors.content_markers.clone(),
            skeleton_markers: self.selectors.skeleton_markers.clone(),
        }
    }

    /// Popup options derived from the timeout table
    #[must_use]
    pub const fn popup_options(&self) -> PopupOptions {
        PopupOptions {
            timeout: Duration::from_millis(self.timeouts.popup_ms),
            dismiss_timeout: Duration::from_millis(self.timeouts.popup_dismiss_ms),
            poll_interval: Duration::from_millis(self.timeouts.poll_ms),
        }
    }

    /// Scroll options derived from the scroll table
    #[must_use]
    pub const fn scroll_options(&self) -> ScrollOptions {
        ScrollOptions {
            step_px: self.scroll.step_px,
            steps_per_swipe: self.scroll.steps_per_swipe,
            step_delay: Duration::from_millis(self.scroll.step_delay_ms),
            settle: Duration::from_millis(self.scroll.settle_ms),
        }
    }
}
