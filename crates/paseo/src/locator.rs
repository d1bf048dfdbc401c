//! Locator abstraction for element selection.
//!
//! A locator is an opaque (strategy, selector) pair supplied by the
//! caller. It may match zero or more elements; the core never assumes
//! uniqueness and never caches the elements it resolves to.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How a selector string is interpreted by the driver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// CSS selector (e.g., `button.primary`)
    Css,
    /// XPath expression
    XPath,
    /// `data-testid` attribute value
    TestId,
    /// Visible text content
    Text,
}

impl Strategy {
    /// Short name used in log and assertion messages
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Css => "css",
            Self::XPath => "xpath",
            Self::TestId => "testid",
            Self::Text => "text",
        }
    }
}

/// An opaque description of how to find page elements.
///
/// Immutable and cheap to clone; defined by the caller (usually the
/// configuration layer) and treated as an opaque key by the core.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Locator {
    /// Selection strategy
    pub strategy: Strategy,
    /// Selector string, interpreted per the strategy
    pub selector: String,
}

impl Locator {
    /// Create a CSS locator
    #[must_use]
    pub fn css(selector: impl Into<String>) -> Self {
        Self {
            strategy: Strategy::Css,
            selector: selector.into(),
        }
    }

    /// Create an XPath locator
    #[must_use]
    pub fn xpath(selector: impl Into<String>) -> Self {
        Self {
            strategy: Strategy::XPath,
            selector: selector.into(),
        }
    }

    /// Create a `data-testid` locator
    #[must_use]
    pub fn test_id(id: impl Into<String>) -> Self {
        Self {
            strategy: Strategy::TestId,
            selector: id.into(),
        }
    }

    /// Create a text-content locator
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            strategy: Strategy::Text,
            selector: text.into(),
        }
    }

    /// JavaScript expression yielding an array of matching elements.
    ///
    /// Drivers that resolve elements through script evaluation (rather
    /// than a native query primitive) use this form.
    #[must_use]
    pub fn to_js_all_query(&self) -> String {
        match self.strategy {
            Strategy::Css => format!("Array.from(document.querySelectorAll({:?}))", self.selector),
            Strategy::XPath => format!(
                "(function() {{ const r = document.evaluate({:?}, document, null, \
                 XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null); \
                 const out = []; for (let i = 0; i < r.snapshotLength; i++) out.push(r.snapshotItem(i)); \
                 return out; }})()",
                self.selector
            ),
            Strategy::TestId => format!(
                "Array.from(document.querySelectorAll('[data-testid={:?}]'))",
                self.selector
            ),
            Strategy::Text => format!(
                "Array.from(document.querySelectorAll('*')).filter(el => el.textContent.includes({:?}))",
                self.selector
            ),
        }
    }

    /// Native CSS form of this locator, when it has one
    #[must_use]
    pub fn as_css(&self) -> Option<String> {
        match self.strategy {
            Strategy::Css => Some(self.selector.clone()),
            Strategy::TestId => Some(format!("[data-testid=\"{}\"]", self.selector)),
            Strategy::XPath | Strategy::Text => None,
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.strategy.as_str(), self.selector)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    mod construction_tests {
        use super::*;

        #[test]
        fn test_css_locator() {
            let locator = Locator::css("a[href=\"/directory\"]");
            assert_eq!(locator.strategy, Strategy::Css);
            assert_eq!(locator.selector, "a[href=\"/directory\"]");
        }

        #[test]
        fn test_test_id_locator() {
            let locator = Locator::test_id("consent-banner");
            assert_eq!(locator.strategy, Strategy::TestId);
        }

        #[test]
        fn test_display_carries_strategy_and_selector() {
            let locator = Locator::css("button.accept");
            assert_eq!(locator.to_string(), "css=button.accept");
        }
    }

    mod query_tests {
        use super::*;

        #[test]
        fn test_css_all_query() {
            let query = Locator::css("article a").to_js_all_query();
            assert!(query.contains("querySelectorAll"));
            assert!(query.contains("article a"));
        }

        #[test]
        fn test_xpath_all_query() {
            let query = Locator::xpath("//button").to_js_all_query();
            assert!(query.contains("document.evaluate"));
            assert!(query.contains("snapshotLength"));
        }

        #[test]
        fn test_text_all_query() {
            let query = Locator::text("Accept").to_js_all_query();
            assert!(query.contains("textContent"));
        }

        #[test]
        fn test_as_css() {
            assert!(Locator::css("div").as_css().is_some());
            assert_eq!(
                Locator::test_id("x").as_css().unwrap(),
                "[data-testid=\"x\"]"
            );
            assert!(Locator::xpath("//div").as_css().is_none());
        }
    }

    mod serde_tests {
        use super::*;

        #[test]
        fn test_locator_round_trips_through_json() {
            let locator = Locator::css("input[data-a-target=\"tw-input\"]");
            let json = serde_json::to_string(&locator).unwrap();
            let back: Locator = serde_json::from_str(&json).unwrap();
            assert_eq!(locator, back);
        }
    }
}
