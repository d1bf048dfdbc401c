//! End-to-end journey runs against a scripted page model.
//!
//! These tests drive the full mobile journey with the in-memory fake
//! driver, scripting the pages the way the real site behaves: a cookie
//! banner over the home page, category suggestions under the search
//! input, a card grid that survives scrolling, and streamer pages one
//! click away.

#![allow(clippy::unwrap_used)]

use paseo::testkit::{ClickEffect, FakeDriver, FakeElementSpec};
use paseo::{Checkpoint, MobileJourney, ScenarioReport, Session, StepStatus, SuiteConfig};

const HOME: &str = "https://m.twitch.tv/";
const CATEGORY: &str = "https://m.twitch.tv/directory/category/starcraft-ii";
const STREAMER: &str = "https://m.twitch.tv/somestreamer/home";

fn fast_config() -> SuiteConfig {
    let mut config = SuiteConfig::default();
    config.timeouts.wait_ms = 200;
    config.timeouts.stability_ms = 200;
    config.timeouts.poll_ms = 5;
    config.timeouts.ready_state_ms = 50;
    config.timeouts.skeleton_ms = 30;
    config.timeouts.popup_ms = 50;
    config.timeouts.popup_dismiss_ms = 100;
    config.scroll.times = 2;
    config.scroll.steps_per_swipe = 3;
    config.scroll.step_delay_ms = 1;
    config.scroll.settle_ms = 1;
    config
}

/// Script a healthy site: banner dismissible, search works, cards
/// navigate to a streamer page.
fn script_happy_site(driver: &FakeDriver, config: &SuiteConfig) {
    let selectors = &config.selectors;

    driver.push_fingerprints(&[1000]);

    driver.insert_element(&selectors.cookie_banner, FakeElementSpec::new());
    driver.insert_element(
        &selectors.cookie_accept,
        FakeElementSpec::new().on_click(ClickEffect::Hide(vec![
            selectors.cookie_banner.to_string(),
            selectors.cookie_accept.to_string(),
        ])),
    );

    driver.insert_element(&selectors.search_icon, FakeElementSpec::new());
    driver.insert_element(&selectors.search_input, FakeElementSpec::new());
    driver.insert_element(
        &selectors.search_suggestion,
        FakeElementSpec::new()
            .with_text("StarCraft II")
            .on_click(ClickEffect::Navigate(CATEGORY.to_string())),
    );

    for _ in 0..3 {
        driver.insert_element(
            &selectors.streamer_card,
            FakeElementSpec::new().on_click(ClickEffect::Navigate(STREAMER.to_string())),
        );
    }
}

async fn run_journey(driver: FakeDriver, config: SuiteConfig) -> (ScenarioReport, tempfile::TempDir) {
    let root = tempfile::tempdir().unwrap();
    let session = Session::new(driver, root.path()).unwrap();
    let report = MobileJourney::new(config).run(&session).await;
    session.close().await.unwrap();
    (report, root)
}

fn step_status(report: &ScenarioReport, name: &str) -> Option<StepStatus> {
    report
        .steps()
        .iter()
        .find(|step| step.name == name)
        .map(|step| step.status)
}

#[tokio::test]
async fn full_journey_passes_on_healthy_site() {
    let config = fast_config();
    let driver = FakeDriver::new("about:blank");
    script_happy_site(&driver, &config);

    let (report, _root) = run_journey(driver.clone(), config).await;

    assert!(report.passed(), "failure: {:?}", report.failure());
    assert_eq!(report.steps().len(), 7);
    assert_eq!(driver.current_url_sync(), STREAMER);
}

#[tokio::test]
async fn journey_captures_checkpoint_screenshots_in_order() {
    let config = fast_config();
    let driver = FakeDriver::new("about:blank");
    script_happy_site(&driver, &config);

    let (report, _root) = run_journey(driver, config).await;

    let names: Vec<String> = report
        .artifacts()
        .iter()
        .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        .collect();
    assert_eq!(
        names,
        vec![
            "01_home_loaded.png",
            "02_before_scroll.png",
            "03_after_scroll_1.png",
            "03_after_scroll_2.png",
            "04_streamer_selected.png",
        ]
    );
    for path in report.artifacts() {
        assert!(path.exists());
    }
}

#[tokio::test]
async fn missing_cookie_banner_is_skipped_not_failed() {
    let config = fast_config();
    let driver = FakeDriver::new("about:blank");
    script_happy_site(&driver, &config);
    driver.hide_all(&config.selectors.cookie_banner);
    driver.hide_all(&config.selectors.cookie_accept);

    let (report, _root) = run_journey(driver, config).await;

    assert!(report.passed());
    assert_eq!(
        step_status(&report, "dismiss_cookie_banner"),
        Some(StepStatus::Skipped)
    );
}

#[tokio::test]
async fn stuck_banner_is_recorded_but_journey_continues() {
    let config = fast_config();
    let driver = FakeDriver::new("about:blank");
    script_happy_site(&driver, &config);
    // Accept click lands but hides nothing, so the banner lingers
    driver.hide_all(&config.selectors.cookie_accept);
    driver.insert_element(&config.selectors.cookie_accept, FakeElementSpec::new());

    let (report, _root) = run_journey(driver, config).await;

    assert!(!report.passed());
    assert_eq!(
        step_status(&report, "dismiss_cookie_banner"),
        Some(StepStatus::Failed)
    );
    // Later steps still ran
    assert_eq!(step_status(&report, "select_streamer"), Some(StepStatus::Passed));
    // The stuck banner left a diagnostic screenshot
    assert!(report
        .artifacts()
        .iter()
        .any(|p| p.to_string_lossy().contains("popup_stuck")));
}

#[tokio::test]
async fn missing_search_icon_aborts_with_failure() {
    let config = fast_config();
    let driver = FakeDriver::new("about:blank");
    script_happy_site(&driver, &config);
    // Visible (so the home page verifies) but outside the viewport, so
    // it never becomes clickable
    driver.hide_all(&config.selectors.search_icon);
    driver.insert_element(
        &config.selectors.search_icon,
        FakeElementSpec::new().below_fold(),
    );

    let (report, _root) = run_journey(driver, config).await;

    assert!(!report.passed());
    let failure = report.failure().unwrap();
    assert_eq!(failure.name, "open_search");
    assert!(failure.detail.as_deref().unwrap().contains("search icon"));
    // The journey stopped there
    assert_eq!(step_status(&report, "enter_search_term"), None);
}

#[tokio::test]
async fn no_suggestions_fails_search_step() {
    let config = fast_config();
    let driver = FakeDriver::new("about:blank");
    script_happy_site(&driver, &config);
    driver.hide_all(&config.selectors.search_suggestion);

    let (report, _root) = run_journey(driver, config).await;

    assert!(!report.passed());
    // hidden suggestions still match the locator, so the count passes
    // but the click never lands
    let failure = report.failure().unwrap();
    assert!(failure.name == "enter_search_term" || failure.name == "pick_suggestion");
}

#[tokio::test]
async fn unclickable_cards_exhaust_attempts_and_fail() {
    let mut config = fast_config();
    config.streamer_attempts = 2;
    let driver = FakeDriver::new("about:blank");
    let selectors = config.selectors.clone();

    driver.push_fingerprints(&[1000]);
    driver.insert_element(&selectors.search_icon, FakeElementSpec::new());
    driver.insert_element(&selectors.search_input, FakeElementSpec::new());
    driver.insert_element(
        &selectors.search_suggestion,
        FakeElementSpec::new().on_click(ClickEffect::Navigate(CATEGORY.to_string())),
    );
    // Every card refuses the click
    for _ in 0..3 {
        driver.insert_element(
            &selectors.streamer_card,
            FakeElementSpec::new().on_click(ClickEffect::FailIntercepted),
        );
    }

    let (report, _root) = run_journey(driver, config).await;

    assert!(!report.passed());
    let failure = report.failure().unwrap();
    assert_eq!(failure.name, "select_streamer");
    assert!(failure
        .detail
        .as_deref()
        .unwrap()
        .contains("failed to select any streamer"));
}

#[tokio::test]
async fn flaky_first_card_falls_through_to_next() {
    let config = fast_config();
    let driver = FakeDriver::new("about:blank");
    let selectors = config.selectors.clone();

    driver.push_fingerprints(&[1000]);
    driver.insert_element(&selectors.search_icon, FakeElementSpec::new());
    driver.insert_element(&selectors.search_input, FakeElementSpec::new());
    driver.insert_element(
        &selectors.search_suggestion,
        FakeElementSpec::new().on_click(ClickEffect::Navigate(CATEGORY.to_string())),
    );
    driver.insert_element(
        &selectors.streamer_card,
        FakeElementSpec::new().on_click(ClickEffect::FailStale),
    );
    driver.insert_element(
        &selectors.streamer_card,
        FakeElementSpec::new().on_click(ClickEffect::Navigate(STREAMER.to_string())),
    );

    let (report, _root) = run_journey(driver.clone(), config).await;

    assert!(report.passed(), "failure: {:?}", report.failure());
    assert_eq!(driver.current_url_sync(), STREAMER);
}

#[tokio::test]
async fn mature_gate_is_accepted_when_present() {
    let config = fast_config();
    let driver = FakeDriver::new("about:blank");
    script_happy_site(&driver, &config);
    driver.insert_element(
        &config.selectors.mature_gate,
        FakeElementSpec::new().on_click(ClickEffect::Hide(vec![config
            .selectors
            .mature_gate
            .to_string()])),
    );

    let (report, _root) = run_journey(driver.clone(), config.clone()).await;

    assert!(report.passed(), "failure: {:?}", report.failure());
    assert!(driver
        .clicks()
        .contains(&config.selectors.mature_gate.to_string()));
}

#[tokio::test]
async fn never_stabilizing_page_still_completes_journey() {
    let config = fast_config();
    let driver = FakeDriver::new("about:blank");
    script_happy_site(&driver, &config);
    // No content markers and a fingerprint that never settles: every
    // stability wait times out softly
    driver.set_fingerprint_counter();

    let (report, _root) = run_journey(driver, config).await;

    assert!(report.passed(), "failure: {:?}", report.failure());
}

#[tokio::test]
async fn session_isolation_keeps_artifacts_apart() {
    let config = fast_config();
    let root = tempfile::tempdir().unwrap();

    let driver_a = FakeDriver::new("about:blank");
    script_happy_site(&driver_a, &config);
    let session_a = Session::new(driver_a, root.path()).unwrap();

    let driver_b = FakeDriver::new("about:blank");
    script_happy_site(&driver_b, &config);
    let session_b = Session::new(driver_b, root.path()).unwrap();

    let journey = MobileJourney::new(config);
    let report_a = journey.run(&session_a).await;
    let report_b = journey.run(&session_b).await;

    assert!(report_a.passed());
    assert!(report_b.passed());
    assert_ne!(session_a.artifact_dir(), session_b.artifact_dir());
    for path in report_a.artifacts() {
        assert!(path.starts_with(session_a.artifact_dir()));
    }
    session_a.close().await.unwrap();
    session_b.close().await.unwrap();
}

#[tokio::test]
async fn report_is_capped_by_first_fatal_failure() {
    let config = fast_config();
    // Nothing scripted at all: home opens but the journey dies at the
    // first required interaction
    let driver = FakeDriver::new("about:blank");
    driver.push_fingerprints(&[1]);

    let (report, _root) = run_journey(driver, config).await;

    assert!(!report.passed());
    let names: Vec<&str> = report.steps().iter().map(|s| s.name).collect();
    // open_home fails its HomePage marker check
    assert_eq!(names, vec!["open_home"]);
}

#[tokio::test]
async fn stuck_popup_screenshot_lands_in_session_dir() {
    let config = fast_config();
    let driver = FakeDriver::new(HOME);
    driver.push_fingerprints(&[1]);
    driver.insert_element(&config.selectors.cookie_banner, FakeElementSpec::new());
    driver.insert_element(&config.selectors.cookie_accept, FakeElementSpec::new());

    let root = tempfile::tempdir().unwrap();
    let session = Session::new(driver, root.path()).unwrap();
    let page = paseo::Page::from_config(&session, &config);
    let outcome = page
        .resolve_popup(&config.selectors.cookie_banner, &config.selectors.cookie_accept)
        .await
        .unwrap();

    assert_eq!(outcome, paseo::PopupOutcome::Stuck);
    let artifact = session.last_artifact().unwrap();
    assert!(artifact.starts_with(session.artifact_dir()));
    assert_eq!(
        artifact.file_name().unwrap().to_string_lossy(),
        format!("{}.png", Checkpoint::PopupStuck.file_stem())
    );
    session.close().await.unwrap();
}
