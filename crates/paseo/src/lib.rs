//! Paseo: browser journey testing for mobile web UIs
//!
//! Paseo (Spanish: "a stroll") drives end-to-end user journeys through
//! a mobile web site and verifies them with explicit assertions. It is
//! built for pages that load asynchronously behind skeleton
//! placeholders and interrupt the user with consent banners and
//! content gates: stability is inferred by fingerprint polling,
//! overlays are resolved by a bounded state machine, and optional UI
//! is handled with soft-fail semantics so absent popups never fail a
//! run.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     PASEO Architecture                       │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌───────────┐   ┌───────────────┐   ┌───────────────────┐   │
//! │  │ Scenario  │──►│ Page facade   │──►│ Driver seam       │   │
//! │  │ (journey) │   │ stability /   │   │ CDP (browser) or  │   │
//! │  │           │   │ popups /guard │   │ FakeDriver (test) │   │
//! │  └───────────┘   └───────────────┘   └───────────────────┘   │
//! │        │                  │                                  │
//! │        ▼                  ▼                                  │
//! │  ScenarioReport     Session + screenshot artifacts           │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use paseo::{MobileJourney, Session, SuiteConfig};
//! use paseo::testkit::FakeDriver;
//!
//! # async fn run() -> paseo::PaseoResult<()> {
//! let config = SuiteConfig::default();
//! let driver = FakeDriver::new("about:blank");
//! let session = Session::new(driver, &config.artifact_dir)?;
//! let report = MobileJourney::new(config).run(&session).await;
//! assert!(report.passed() || report.failure().is_some());
//! session.close().await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
// Lints are configured in workspace Cargo.toml [workspace.lints.clippy]

pub mod assertion;
pub mod config;
pub mod driver;
pub mod interaction;
pub mod locator;
pub mod page;
pub mod popup;
pub mod result;
pub mod scenario;
pub mod session;
pub mod stability;
pub mod testkit;
pub mod wait;

pub use config::{DeviceProfile, ScrollConfig, SelectorSet, SuiteConfig, TimeoutConfig};
pub use driver::{BrowserOptions, Driver, Element};
pub use interaction::{InteractionGuard, ScrollOptions};
pub use locator::{Locator, Strategy};
pub use page::{Page, PageObject};
pub use popup::{PopupOptions, PopupOutcome, PopupResolver};
pub use result::{PaseoError, PaseoResult};
pub use scenario::{MobileJourney, ScenarioReport, StepRecord, StepStatus};
pub use session::{Checkpoint, Session};
pub use stability::{StabilityDetector, StabilityOptions, StabilityTracker};
pub use wait::{UrlPattern, WaitOptions};

#[cfg(feature = "browser")]
pub use driver::{CdpDriver, CdpElement};

/// Logging setup for binaries and integration tests.
#[cfg(not(target_arch = "wasm32"))]
pub mod logging {
    use tracing_subscriber::EnvFilter;

    /// Initialize a tracing subscriber honoring `RUST_LOG`, defaulting
    /// to `info` for this crate. Safe to call more than once; later
    /// calls are no-ops.
    pub fn init() {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("paseo=info"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .try_init();
    }
}
