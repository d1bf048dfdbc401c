//! The mobile user journey.
//!
//! One fixed end-to-end scenario: open the mobile home page, clear the
//! cookie banner, search for a category, open it, scroll the channel
//! grid, and land on a streamer page. Each step records its outcome in
//! a [`ScenarioReport`]; optional steps may be skipped, required steps
//! failing abort the run.

use std::time::Duration;
use tracing::{info, warn};

use crate::config::SuiteConfig;
use crate::driver::Driver;
use crate::locator::Locator;
use crate::page::{Page, PageObject};
use crate::popup::PopupOutcome;
use crate::result::{PaseoError, PaseoResult};
use crate::session::{Checkpoint, Session};
use crate::wait::UrlPattern;

/// The mobile landing page
pub struct HomePage;

impl PageObject for HomePage {
    fn url_pattern() -> UrlPattern {
        UrlPattern::Contains("twitch.tv".into())
    }

    fn ready_marker() -> Option<Locator> {
        Some(Locator::css("a[href=\"/directory\"]"))
    }
}

/// A category page under /directory
pub struct DirectoryPage;

impl PageObject for DirectoryPage {
    fn url_pattern() -> UrlPattern {
        UrlPattern::Contains("/directory".into())
    }

    fn ready_marker() -> Option<Locator> {
        Some(Locator::css("article a[href$='/home'].tw-link"))
    }
}

/// An individual streamer's page.
///
/// Streamer URLs carry no fixed fragment; identity is established by
/// URL depth instead of a pattern.
pub struct StreamerPage;

impl PageObject for StreamerPage {
    fn url_pattern() -> UrlPattern {
        UrlPattern::Any
    }

    fn load_timeout() -> Duration {
        Duration::from_secs(20)
    }
}

/// Outcome of one journey step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    /// Step completed and its postconditions held
    Passed,
    /// Optional step found nothing to do
    Skipped,
    /// Step failed
    Failed,
}

/// One recorded journey step
#[derive(Debug, Clone)]
pub struct StepRecord {
    /// Step name
    pub name: &'static str,
    /// Outcome
    pub status: StepStatus,
    /// Failure detail, when failed
    pub detail: Option<String>,
}

/// Accumulated outcome of a journey run
#[derive(Debug, Clone, Default)]
pub struct ScenarioReport {
    steps: Vec<StepRecord>,
    artifacts: Vec<std::path::PathBuf>,
}

impl ScenarioReport {
    fn pass(&mut self, name: &'static str) {
        info!(step = name, "step passed");
        self.steps.push(StepRecord {
            name,
            status: StepStatus::Passed,
            detail: None,
        });
    }

    fn skip(&mut self, name: &'static str, detail: impl Into<String>) {
        let detail = detail.into();
        info!(step = name, detail = %detail, "step skipped");
        self.steps.push(StepRecord {
            name,
            status: StepStatus::Skipped,
            detail: Some(detail),
        });
    }

    fn fail(&mut self, name: &'static str, detail: impl Into<String>) {
        let detail = detail.into();
        warn!(step = name, detail = %detail, "step failed");
        self.steps.push(StepRecord {
            name,
            status: StepStatus::Failed,
            detail: Some(detail),
        });
    }

    /// All recorded steps, in execution order
    #[must_use]
    pub fn steps(&self) -> &[StepRecord] {
        &self.steps
    }

    /// Whether every required step passed (skips allowed, fails not)
    #[must_use]
    pub fn passed(&self) -> bool {
        self.steps
            .iter()
            .all(|step| step.status != StepStatus::Failed)
    }

    /// The first failed step, if any
    #[must_use]
    pub fn failure(&self) -> Option<&StepRecord> {
        self.steps
            .iter()
            .find(|step| step.status == StepStatus::Failed)
    }

    /// Screenshot paths captured during the run
    #[must_use]
    pub fn artifacts(&self) -> &[std::path::PathBuf] {
        &self.artifacts
    }
}

/// The fixed search-and-select journey over the mobile site.
#[derive(Debug, Clone, Default)]
pub struct MobileJourney {
    config: SuiteConfig,
}

impl MobileJourney {
    /// Create a journey from a suite config
    #[must_use]
    pub const fn new(config: SuiteConfig) -> Self {
        Self { config }
    }

    /// The journey's configuration
    #[must_use]
    pub const fn config(&self) -> &SuiteConfig {
        &self.config
    }

    /// Run the journey over an open session.
    ///
    /// The run aborts at the first failed required step; the report
    /// always carries every step attempted plus the artifacts captured
    /// up to that point.
    pub async fn run<D: Driver>(&self, session: &Session<D>) -> ScenarioReport {
        let page = Page::from_config(session, &self.config);
        let mut report = ScenarioReport::default();

        'journey: {
            if let Err(e) = self.open_home(&page).await {
                report.fail("open_home", e.to_string());
                break 'journey;
            }
            report.pass("open_home");

            match self.dismiss_cookie_banner(&page).await {
                Ok(CookieOutcome::Dismissed) => report.pass("dismiss_cookie_banner"),
                Ok(CookieOutcome::Absent) => {
                    report.skip("dismiss_cookie_banner", "banner never appeared");
                }
                Ok(CookieOutcome::Stuck) => {
                    // A lingering banner is worth recording but most of
                    // the journey still works underneath it
                    report.fail("dismiss_cookie_banner", "banner survived dismissal");
                }
                Err(e) => {
                    report.fail("dismiss_cookie_banner", e.to_string());
                    break 'journey;
                }
            }

            if let Err(e) = self.open_search(&page).await {
                report.fail("open_search", e.to_string());
                break 'journey;
            }
            report.pass("open_search");

            if let Err(e) = self.enter_search_term(&page).await {
                report.fail("enter_search_term", e.to_string());
                break 'journey;
            }
            report.pass("enter_search_term");

            if let Err(e) = self.pick_suggestion(&page).await {
                report.fail("pick_suggestion", e.to_string());
                break 'journey;
            }
            report.pass("pick_suggestion");

            if let Err(e) = self.scroll_results(&page).await {
                report.fail("scroll_results", e.to_string());
                break 'journey;
            }
            report.pass("scroll_results");

            if let Err(e) = self.select_streamer(&page).await {
                report.fail("select_streamer", e.to_string());
                break 'journey;
            }
            report.pass("select_streamer");
        }

        report.artifacts = session.artifacts();
        report
    }

    /// Open the landing page and verify we are on the right site
    async fn open_home<D: Driver>(&self, page: &Page<'_, D>) -> PaseoResult<()> {
        page.open(&self.config.base_url).await?;
        page.assert_url_contains(&self.config.domain_fragment, Some("should be on site domain"))
            .await?;
        page.ensure_on::<HomePage>().await
    }

    /// Resolve the cookie consent banner
    async fn dismiss_cookie_banner<D: Driver>(
        &self,
        page: &Page<'_, D>,
    ) -> PaseoResult<CookieOutcome> {
        let selectors = &self.config.selectors;
        let outcome = page
            .resolve_popup(&selectors.cookie_banner, &selectors.cookie_accept)
            .await?;
        match outcome {
            PopupOutcome::Absent => Ok(CookieOutcome::Absent),
            PopupOutcome::Dismissed => {
                page.assert_not_visible(
                    &selectors.cookie_banner,
                    Some("banner should be gone after accept"),
                )
                .await?;
                Ok(CookieOutcome::Dismissed)
            }
            PopupOutcome::Stuck => Ok(CookieOutcome::Stuck),
        }
    }

    /// Open the search surface from the home page
    async fn open_search<D: Driver>(&self, page: &Page<'_, D>) -> PaseoResult<()> {
        let selectors = &self.config.selectors;
        if !page.click(&selectors.search_icon).await? {
            return Err(PaseoError::assertion(
                "search icon never became clickable on home page",
            ));
        }
        page.assert_visible(
            &selectors.search_input,
            Some("search input should appear after opening search"),
        )
        .await
    }

    /// Type the search term and wait for suggestions
    async fn enter_search_term<D: Driver>(&self, page: &Page<'_, D>) -> PaseoResult<()> {
        let selectors = &self.config.selectors;
        if !page
            .type_text(&selectors.search_input, &self.config.search_term)
            .await?
        {
            return Err(PaseoError::assertion("search input rejected text entry"));
        }
        page.assert_count_at_least(
            &selectors.search_suggestion,
            1,
            Some("suggestions should appear for search term"),
        )
        .await?;
        Ok(())
    }

    /// Click the first suggestion and land on the category page
    async fn pick_suggestion<D: Driver>(&self, page: &Page<'_, D>) -> PaseoResult<()> {
        let selectors = &self.config.selectors;
        if !page.click(&selectors.search_suggestion).await? {
            return Err(PaseoError::assertion("no search suggestion was clickable"));
        }
        page.wait_for_stable().await?;
        page.assert_url_contains("/directory", Some("should land on a directory page"))
            .await?;
        page.ensure_on::<DirectoryPage>().await
    }

    /// Scroll the channel grid, capturing before and after each swipe
    async fn scroll_results<D: Driver>(&self, page: &Page<'_, D>) -> PaseoResult<()> {
        let selectors = &self.config.selectors;
        page.session().capture(Checkpoint::BeforeScroll).await?;
        let initial = page
            .assert_count_at_least(&selectors.streamer_card, 1, Some("grid should have cards"))
            .await?;

        for swipe in 1..=self.config.scroll.times {
            page.swipe_down(1).await?;
            page.session().capture(Checkpoint::AfterScroll(swipe)).await?;
        }

        // Lazy loading may add cards; scrolling must never lose them
        let after = page
            .assert_count_at_least(
                &selectors.streamer_card,
                initial,
                Some("card count should not shrink while scrolling"),
            )
            .await?;
        info!(initial, after, "grid scrolled");
        Ok(())
    }

    /// Pick any streamer card that accepts a click and verify we left
    /// the directory for an individual page
    async fn select_streamer<D: Driver>(&self, page: &Page<'_, D>) -> PaseoResult<()> {
        let selectors = &self.config.selectors;
        let clicked = page
            .click_first_actionable(&selectors.streamer_card, self.config.streamer_attempts)
            .await?;
        if !clicked {
            return Err(PaseoError::assertion(
                "failed to select any streamer after multiple attempts",
            ));
        }

        page.wait_for_stable().await?;
        if page.accept_gate(&selectors.mature_gate).await? {
            info!("mature content gate accepted");
            page.wait_for_stable().await?;
        }

        page.session().capture(Checkpoint::StreamerSelected).await?;
        page.assert_url_depth_at_least(3, Some("should be on an individual streamer page"))
            .await?;
        let url = page.session().driver().current_url().await?;
        if url.contains("/directory") {
            return Err(PaseoError::assertion(format!(
                "expected to leave the directory, still on '{url}'"
            )));
        }
        page.ensure_on::<StreamerPage>().await
    }
}

/// Internal cookie-banner outcome, separating skip from soft failure
enum CookieOutcome {
    Absent,
    Dismissed,
    Stuck,
}
