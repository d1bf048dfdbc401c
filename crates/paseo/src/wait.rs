//! Bounded-wait primitives.
//!
//! All waiting in this crate is cooperative polling: a fixed sleep
//! interval against a deadline. Every wait returns, success or not,
//! within its timeout plus at most one poll interval; nothing blocks
//! indefinitely.

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Default timeout for element waits (10 seconds)
pub const DEFAULT_WAIT_TIMEOUT_MS: u64 = 10_000;

/// Default polling interval (500ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 500;

/// Options shared by the bounded polling loops
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOptions {
    /// Upper bound on total wait time
    pub timeout: Duration,
    /// Sleep between polls
    pub poll_interval: Duration,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(DEFAULT_WAIT_TIMEOUT_MS),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        }
    }
}

impl WaitOptions {
    /// Create wait options with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the timeout
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
}

/// A started wait with a fixed upper bound.
///
/// The polling loops check their condition first and the deadline
/// second, so a condition that holds immediately succeeds even with a
/// zero timeout.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    started: Instant,
    timeout: Duration,
}

impl Deadline {
    /// Start a deadline expiring after `timeout`
    #[must_use]
    pub fn after(timeout: Duration) -> Self {
        Self {
            started: Instant::now(),
            timeout,
        }
    }

    /// Whether the deadline has passed
    #[must_use]
    pub fn expired(&self) -> bool {
        self.started.elapsed() >= self.timeout
    }

    /// Time spent since the deadline was started
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// The configured upper bound
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// URL matching for navigation postconditions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UrlPattern {
    /// Exact URL match
    Exact(String),
    /// Prefix match
    Prefix(String),
    /// Contains substring
    Contains(String),
    /// Regex match
    Regex(String),
    /// Match any URL
    Any,
}

impl UrlPattern {
    /// Check if a URL matches this pattern
    #[must_use]
    pub fn matches(&self, url: &str) -> bool {
        match self {
            Self::Exact(pattern) => url == pattern,
            Self::Prefix(pattern) => url.starts_with(pattern),
            Self::Contains(pattern) => url.contains(pattern),
            Self::Regex(pattern) => regex::Regex::new(pattern)
                .map(|re| re.is_match(url))
                .unwrap_or(false),
            Self::Any => true,
        }
    }
}

impl std::fmt::Display for UrlPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Exact(p) => write!(f, "exactly '{p}'"),
            Self::Prefix(p) => write!(f, "starting with '{p}'"),
            Self::Contains(p) => write!(f, "containing '{p}'"),
            Self::Regex(p) => write!(f, "matching /{p}/"),
            Self::Any => write!(f, "any URL"),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    mod wait_options_tests {
        use super::*;

        #[test]
        fn test_defaults() {
            let opts = WaitOptions::default();
            assert_eq!(opts.timeout, Duration::from_millis(DEFAULT_WAIT_TIMEOUT_MS));
            assert_eq!(
                opts.poll_interval,
                Duration::from_millis(DEFAULT_POLL_INTERVAL_MS)
            );
        }

        #[test]
        fn test_builder_chain() {
            let opts = WaitOptions::new()
                .with_timeout(Duration::from_millis(300))
                .with_poll_interval(Duration::from_millis(20));
            assert_eq!(opts.timeout, Duration::from_millis(300));
            assert_eq!(opts.poll_interval, Duration::from_millis(20));
        }
    }

    mod deadline_tests {
        use super::*;

        #[test]
        fn test_zero_timeout_is_immediately_expired() {
            let deadline = Deadline::after(Duration::ZERO);
            assert!(deadline.expired());
        }

        #[test]
        fn test_long_timeout_is_not_expired() {
            let deadline = Deadline::after(Duration::from_secs(60));
            assert!(!deadline.expired());
            assert_eq!(deadline.timeout(), Duration::from_secs(60));
        }

        #[test]
        fn test_expires_after_sleeping_past_bound() {
            let deadline = Deadline::after(Duration::from_millis(10));
            std::thread::sleep(Duration::from_millis(20));
            assert!(deadline.expired());
            assert!(deadline.elapsed() >= Duration::from_millis(10));
        }
    }

    mod url_pattern_tests {
        use super::*;

        #[test]
        fn test_exact() {
            let pattern = UrlPattern::Exact("https://m.twitch.tv/".into());
            assert!(pattern.matches("https://m.twitch.tv/"));
            assert!(!pattern.matches("https://m.twitch.tv/directory"));
        }

        #[test]
        fn test_prefix() {
            let pattern = UrlPattern::Prefix("https://m.twitch.tv".into());
            assert!(pattern.matches("https://m.twitch.tv/directory"));
            assert!(!pattern.matches("https://example.com"));
        }

        #[test]
        fn test_contains() {
            let pattern = UrlPattern::Contains("/directory".into());
            assert!(pattern.matches("https://m.twitch.tv/directory/category/x"));
            assert!(!pattern.matches("https://m.twitch.tv/"));
        }

        #[test]
        fn test_regex() {
            let pattern = UrlPattern::Regex(r"/directory/category/[a-z-]+$".into());
            assert!(pattern.matches("https://m.twitch.tv/directory/category/starcraft-ii"));
            assert!(!pattern.matches("https://m.twitch.tv/directory"));
        }

        #[test]
        fn test_invalid_regex_never_matches() {
            let pattern = UrlPattern::Regex("(".into());
            assert!(!pattern.matches("anything"));
        }

        #[test]
        fn test_any() {
            assert!(UrlPattern::Any.matches(""));
            assert!(UrlPattern::Any.matches("https://example.com"));
        }
    }
}
