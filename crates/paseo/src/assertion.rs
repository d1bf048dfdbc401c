//! Scenario assertions.
//!
//! Assertions are explicit postconditions: unlike the soft-fail
//! interaction guard, a failed assertion is fatal to the running
//! scenario. Element assertions poll within a bounded wait before
//! giving up, so a page still settling does not fail spuriously.
//! Every failure message interpolates the actual value next to the
//! expected one.

use tracing::debug;

use crate::driver::{Driver, Element};
use crate::interaction::first_actionable;
use crate::locator::Locator;
use crate::result::{PaseoError, PaseoResult};
use crate::wait::{Deadline, UrlPattern, WaitOptions};

fn fail(message: Option<&str>, detail: String) -> PaseoError {
    match message {
        Some(context) => PaseoError::assertion(format!("{context}: {detail}")),
        None => PaseoError::assertion(detail),
    }
}

/// Assert that the current URL contains a fragment.
///
/// # Errors
///
/// Returns [`PaseoError::AssertionFailed`] when the fragment is absent.
pub async fn assert_url_contains<D: Driver>(
    driver: &D,
    fragment: &str,
    message: Option<&str>,
) -> PaseoResult<()> {
    let url = driver.current_url().await?;
    if url.contains(fragment) {
        debug!(url = %url, fragment, "url contains fragment");
        return Ok(());
    }
    Err(fail(
        message,
        format!("expected URL containing '{fragment}', got '{url}'"),
    ))
}

/// Assert that the current URL matches a pattern.
///
/// # Errors
///
/// Returns [`PaseoError::AssertionFailed`] when the URL does not match.
pub async fn assert_url_matches<D: Driver>(
    driver: &D,
    pattern: &UrlPattern,
    message: Option<&str>,
) -> PaseoResult<()> {
    let url = driver.current_url().await?;
    if pattern.matches(&url) {
        return Ok(());
    }
    Err(fail(
        message,
        format!("expected URL {pattern}, got '{url}'"),
    ))
}

/// Assert that the current URL's path has at least `depth` non-empty
/// segments, counting the scheme-and-host segments of the full URL.
///
/// A streamer page like `https://m.twitch.tv/somestreamer/home` has
/// depth 4 under this count; the bare host has depth 2.
///
/// # Errors
///
/// Returns [`PaseoError::AssertionFailed`] when the URL is shallower.
pub async fn assert_url_path_depth_at_least<D: Driver>(
    driver: &D,
    depth: usize,
    message: Option<&str>,
) -> PaseoResult<()> {
    let url = driver.current_url().await?;
    let segments = url.split('/').filter(|s| !s.is_empty()).count();
    if segments >= depth {
        return Ok(());
    }
    Err(fail(
        message,
        format!("expected URL depth >= {depth}, got {segments} in '{url}'"),
    ))
}

/// Assert that at least one match for the locator becomes visible
/// within the wait budget.
///
/// # Errors
///
/// Returns [`PaseoError::AssertionFailed`] when nothing is visible at
/// the bound.
pub async fn assert_element_visible<D: Driver>(
    driver: &D,
    locator: &Locator,
    waits: &WaitOptions,
    message: Option<&str>,
) -> PaseoResult<()> {
    let deadline = Deadline::after(waits.timeout);
    loop {
        if any_visible(driver, locator).await? {
            debug!(target = %locator, "element visible");
            return Ok(());
        }
        if deadline.expired() {
            return Err(fail(
                message,
                format!(
                    "expected visible element {locator} within {}ms",
                    waits.timeout.as_millis()
                ),
            ));
        }
        tokio::time::sleep(waits.poll_interval).await;
    }
}

/// Assert that no match for the locator is visible.
///
/// Point-in-time check, no wait: used to confirm that something which
/// was just dismissed is actually gone.
///
/// # Errors
///
/// Returns [`PaseoError::AssertionFailed`] when a match is visible.
pub async fn assert_element_not_visible<D: Driver>(
    driver: &D,
    locator: &Locator,
    message: Option<&str>,
) -> PaseoResult<()> {
    if any_visible(driver, locator).await? {
        return Err(fail(
            message,
            format!("expected no visible element {locator}, but one is visible"),
        ));
    }
    Ok(())
}

/// Assert that a match becomes visible, in viewport, and enabled
/// within the wait budget.
///
/// # Errors
///
/// Returns [`PaseoError::AssertionFailed`] when no match is clickable
/// at the bound.
pub async fn assert_element_clickable<D: Driver>(
    driver: &D,
    locator: &Locator,
    waits: &WaitOptions,
    message: Option<&str>,
) -> PaseoResult<()> {
    let deadline = Deadline::after(waits.timeout);
    loop {
        if first_actionable(driver, locator, true).await?.is_some() {
            debug!(target = %locator, "element clickable");
            return Ok(());
        }
        if deadline.expired() {
            return Err(fail(
                message,
                format!(
                    "expected clickable element {locator} within {}ms",
                    waits.timeout.as_millis()
                ),
            ));
        }
        tokio::time::sleep(waits.poll_interval).await;
    }
}

/// Assert that at least `minimum` elements match the locator within
/// the wait budget; returns the count actually observed.
///
/// # Errors
///
/// Returns [`PaseoError::AssertionFailed`] when the count stays below
/// the minimum.
pub async fn assert_element_count_at_least<D: Driver>(
    driver: &D,
    locator: &Locator,
    minimum: usize,
    waits: &WaitOptions,
    message: Option<&str>,
) -> PaseoResult<usize> {
    let deadline = Deadline::after(waits.timeout);
    let mut observed = 0;
    loop {
        observed = observed.max(driver.find_elements(locator).await?.len());
        if observed >= minimum {
            debug!(target = %locator, observed, "element count satisfied");
            return Ok(observed);
        }
        if deadline.expired() {
            return Err(fail(
                message,
                format!("expected at least {minimum} of {locator}, got {observed}"),
            ));
        }
        tokio::time::sleep(waits.poll_interval).await;
    }
}

/// Assert that some visible match contains the expected text,
/// case-insensitively, within the wait budget.
///
/// # Errors
///
/// Returns [`PaseoError::AssertionFailed`] when no match carries the
/// text at the bound.
pub async fn assert_text_in_element<D: Driver>(
    driver: &D,
    locator: &Locator,
    expected: &str,
    waits: &WaitOptions,
    message: Option<&str>,
) -> PaseoResult<()> {
    let needle = expected.to_lowercase();
    let deadline = Deadline::after(waits.timeout);
    let mut last_seen = String::new();
    loop {
        for element in driver.find_elements(locator).await? {
            match element.text().await {
                Ok(text) => {
                    if text.to_lowercase().contains(&needle) {
                        return Ok(());
                    }
                    last_seen = text;
                }
                Err(e) if e.is_recoverable() => {}
                Err(e) => return Err(e),
            }
        }
        if deadline.expired() {
            return Err(fail(
                message,
                format!("expected text '{expected}' in {locator}, last saw '{last_seen}'"),
            ));
        }
        tokio::time::sleep(waits.poll_interval).await;
    }
}

async fn any_visible<D: Driver>(driver: &D, locator: &Locator) -> PaseoResult<bool> {
    for element in driver.find_elements(locator).await? {
        match element.is_displayed().await {
            Ok(true) => return Ok(true),
            Ok(false) => {}
            Err(e) if e.is_recoverable() => {}
            Err(e) => return Err(e),
        }
    }
    Ok(false)
}
