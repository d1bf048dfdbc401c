//! Scripted in-memory driver for tests.
//!
//! [`FakeDriver`] implements the [`Driver`] seam over a mutable page
//! model: elements are inserted with scripted visibility, click
//! effects, and failure modes, and the content fingerprint read by the
//! stability detector is replayed from a script. Navigation bumps an
//! epoch counter so element handles taken before it go stale, matching
//! real browser behavior.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::driver::{Driver, Element};
use crate::locator::Locator;
use crate::result::{PaseoError, PaseoResult};

/// What happens when a scripted element is clicked
#[derive(Debug, Clone)]
pub enum ClickEffect {
    /// Click lands, nothing changes
    None,
    /// Click lands and hides every element under the given keys
    Hide(Vec<String>),
    /// Click lands and navigates to the URL (bumping the epoch)
    Navigate(String),
    /// Click always fails as intercepted
    FailIntercepted,
    /// Click always fails as stale
    FailStale,
    /// First click fails stale; a fresh handle's click lands and hides
    /// the given keys
    FailStaleOnce(Vec<String>),
}

/// Builder for one scripted element
#[derive(Debug, Clone)]
pub struct FakeElementSpec {
    visible: bool,
    visible_after_polls: u32,
    enabled: bool,
    in_viewport: bool,
    text: String,
    on_click: ClickEffect,
}

impl Default for FakeElementSpec {
    fn default() -> Self {
        Self {
            visible: true,
            visible_after_polls: 0,
            enabled: true,
            in_viewport: true,
            text: String::new(),
            on_click: ClickEffect::None,
        }
    }
}

impl FakeElementSpec {
    /// A visible, enabled, in-viewport element with no click effect
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stay invisible for the first `polls` visibility checks
    #[must_use]
    pub const fn visible_after_polls(mut self, polls: u32) -> Self {
        self.visible_after_polls = polls;
        self
    }

    /// Never visible
    #[must_use]
    pub const fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    /// Not enabled
    #[must_use]
    pub const fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Rendered outside the visual viewport
    #[must_use]
    pub const fn below_fold(mut self) -> Self {
        self.in_viewport = false;
        self
    }

    /// Initial text content / input value
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Effect of clicking this element
    #[must_use]
    pub fn on_click(mut self, effect: ClickEffect) -> Self {
        self.on_click = effect;
        self
    }
}

#[derive(Debug)]
struct FakeElementState {
    spec: FakeElementSpec,
    polls_seen: u32,
    stale_fired: bool,
}

#[derive(Debug)]
enum FingerprintScript {
    /// Replay these values; the last one repeats forever
    Replay(VecDeque<u64>, u64),
    /// A fingerprint that changes on every read
    Counter(u64),
}

impl FingerprintScript {
    fn next(&mut self) -> u64 {
        match self {
            Self::Replay(queue, last) => {
                if let Some(value) = queue.pop_front() {
                    *last = value;
                }
                *last
            }
            Self::Counter(n) => {
                *n += 1;
                *n
            }
        }
    }
}

#[derive(Debug)]
struct FakeState {
    url: String,
    elements: HashMap<String, Vec<FakeElementState>>,
    fingerprints: FingerprintScript,
    script_log: Vec<String>,
    screenshots: Vec<PathBuf>,
    clicks: Vec<String>,
    epoch: u64,
    quit_called: bool,
}

/// In-memory scripted driver
#[derive(Debug, Clone)]
pub struct FakeDriver {
    inner: Arc<Mutex<FakeState>>,
}

impl FakeDriver {
    /// Create a driver whose page is at `url` with no elements
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(FakeState {
                url: url.into(),
                elements: HashMap::new(),
                fingerprints: FingerprintScript::Replay(VecDeque::new(), 0),
                script_log: Vec::new(),
                screenshots: Vec::new(),
                clicks: Vec::new(),
                epoch: 0,
                quit_called: false,
            })),
        }
    }

    fn lock(&self) -> PaseoResult<MutexGuard<'_, FakeState>> {
        self.inner.lock().map_err(|_| PaseoError::Driver {
            message: "fake driver state poisoned".to_string(),
        })
    }

    /// Add one scripted element under the locator's key
    pub fn insert_element(&self, locator: &Locator, spec: FakeElementSpec) {
        if let Ok(mut state) = self.lock() {
            state
                .elements
                .entry(locator.to_string())
                .or_default()
                .push(FakeElementState {
                    spec,
                    polls_seen: 0,
                    stale_fired: false,
                });
        }
    }

    /// Hide every element under the locator's key
    pub fn hide_all(&self, locator: &Locator) {
        if let Ok(mut state) = self.lock() {
            if let Some(elements) = state.elements.get_mut(&locator.to_string()) {
                for element in elements {
                    element.spec.visible = false;
                    element.spec.visible_after_polls = 0;
                }
            }
        }
    }

    /// Script the fingerprint sequence; the last value repeats forever
    pub fn push_fingerprints(&self, values: &[u64]) {
        if let Ok(mut state) = self.lock() {
            let last = values.last().copied().unwrap_or(0);
            state.fingerprints = FingerprintScript::Replay(values.iter().copied().collect(), last);
        }
    }

    /// Make the fingerprint change on every read (a page that never
    /// settles)
    pub fn set_fingerprint_counter(&self) {
        if let Ok(mut state) = self.lock() {
            state.fingerprints = FingerprintScript::Counter(0);
        }
    }

    /// Replace the current URL without bumping the epoch
    pub fn set_url(&self, url: impl Into<String>) {
        if let Ok(mut state) = self.lock() {
            state.url = url.into();
        }
    }

    /// Locator keys of every click that landed, in order
    #[must_use]
    pub fn clicks(&self) -> Vec<String> {
        self.lock().map(|state| state.clicks.clone()).unwrap_or_default()
    }

    /// Every script expression evaluated, in order
    #[must_use]
    pub fn script_log(&self) -> Vec<String> {
        self.lock()
            .map(|state| state.script_log.clone())
            .unwrap_or_default()
    }

    /// Paths of every screenshot captured
    #[must_use]
    pub fn screenshots(&self) -> Vec<PathBuf> {
        self.lock()
            .map(|state| state.screenshots.clone())
            .unwrap_or_default()
    }

    /// Current text of the element at `index` under the locator's key
    #[must_use]
    pub fn element_text(&self, locator: &Locator, index: usize) -> String {
        self.lock()
            .ok()
            .and_then(|state| {
                state
                    .elements
                    .get(&locator.to_string())
                    .and_then(|elements| elements.get(index))
                    .map(|element| element.spec.text.clone())
            })
            .unwrap_or_default()
    }

    /// The current URL, without going through the async trait
    #[must_use]
    pub fn current_url_sync(&self) -> String {
        self.lock().map(|state| state.url.clone()).unwrap_or_default()
    }

    /// Whether `quit` was called
    #[must_use]
    pub fn quit_called(&self) -> bool {
        self.lock().map(|state| state.quit_called).unwrap_or(false)
    }

    fn apply_click(&self, key: &str, index: usize, epoch: u64) -> PaseoResult<()> {
        let mut state = self.lock()?;
        if epoch != state.epoch {
            return Err(PaseoError::StaleElement {
                locator: key.to_string(),
            });
        }
        let effect = {
            let Some(element) = state
                .elements
                .get_mut(key)
                .and_then(|elements| elements.get_mut(index))
            else {
                return Err(PaseoError::StaleElement {
                    locator: key.to_string(),
                });
            };
            match &element.spec.on_click {
                ClickEffect::FailIntercepted => {
                    return Err(PaseoError::ClickIntercepted {
                        locator: key.to_string(),
                    });
                }
                ClickEffect::FailStale => {
                    return Err(PaseoError::StaleElement {
                        locator: key.to_string(),
                    });
                }
                ClickEffect::FailStaleOnce(keys) => {
                    if element.stale_fired {
                        ClickEffect::Hide(keys.clone())
                    } else {
                        element.stale_fired = true;
                        return Err(PaseoError::StaleElement {
                            locator: key.to_string(),
                        });
                    }
                }
                effect => effect.clone(),
            }
        };
        state.clicks.push(key.to_string());
        match effect {
            ClickEffect::None | ClickEffect::FailIntercepted | ClickEffect::FailStale
            | ClickEffect::FailStaleOnce(_) => {}
            ClickEffect::Hide(keys) => {
                for hide_key in keys {
                    if let Some(elements) = state.elements.get_mut(&hide_key) {
                        for element in elements {
                            element.spec.visible = false;
                            element.spec.visible_after_polls = 0;
                        }
                    }
                }
            }
            ClickEffect::Navigate(url) => {
                state.url = url;
                state.epoch += 1;
            }
        }
        Ok(())
    }

    fn with_element<T>(
        &self,
        key: &str,
        index: usize,
        epoch: u64,
        f: impl FnOnce(&mut FakeElementState) -> T,
    ) -> PaseoResult<T> {
        let mut state = self.lock()?;
        if epoch != state.epoch {
            return Err(PaseoError::StaleElement {
                locator: key.to_string(),
            });
        }
        state
            .elements
            .get_mut(key)
            .and_then(|elements| elements.get_mut(index))
            .map(f)
            .ok_or_else(|| PaseoError::StaleElement {
                locator: key.to_string(),
            })
    }
}

#[async_trait]
impl Driver for FakeDriver {
    type Element = FakeElement;

    async fn navigate(&self, url: &str) -> PaseoResult<()> {
        let mut state = self.lock()?;
        state.url = url.to_string();
        state.epoch += 1;
        Ok(())
    }

    async fn find_elements(&self, locator: &Locator) -> PaseoResult<Vec<Self::Element>> {
        let state = self.lock()?;
        let key = locator.to_string();
        let count = state.elements.get(&key).map_or(0, Vec::len);
        let epoch = state.epoch;
        Ok((0..count)
            .map(|index| FakeElement {
                driver: self.clone(),
                key: key.clone(),
                index,
                epoch,
            })
            .collect())
    }

    async fn execute_script(&self, script: &str, _args: Vec<Value>) -> PaseoResult<Value> {
        let mut state = self.lock()?;
        state.script_log.push(script.to_string());
        if script.contains("innerHTML.length") {
            let value = state.fingerprints.next();
            return Ok(Value::from(value));
        }
        if script.contains("readyState") {
            return Ok(Value::from("complete"));
        }
        Ok(Value::Null)
    }

    async fn screenshot(&self, path: &Path) -> PaseoResult<()> {
        // Minimal valid-enough PNG stub
        std::fs::write(path, b"\x89PNG\r\n\x1a\n")?;
        self.lock()?.screenshots.push(path.to_path_buf());
        Ok(())
    }

    async fn current_url(&self) -> PaseoResult<String> {
        Ok(self.lock()?.url.clone())
    }

    async fn quit(&self) -> PaseoResult<()> {
        self.lock()?.quit_called = true;
        Ok(())
    }
}

/// Handle to one scripted element; goes stale when the driver
/// navigates after the handle was taken
#[derive(Debug, Clone)]
pub struct FakeElement {
    driver: FakeDriver,
    key: String,
    index: usize,
    epoch: u64,
}

#[async_trait]
impl Element for FakeElement {
    async fn click(&self) -> PaseoResult<()> {
        self.driver.apply_click(&self.key, self.index, self.epoch)
    }

    async fn send_keys(&self, text: &str) -> PaseoResult<()> {
        self.driver
            .with_element(&self.key, self.index, self.epoch, |element| {
                element.spec.text.push_str(text);
            })
    }

    async fn clear(&self) -> PaseoResult<()> {
        self.driver
            .with_element(&self.key, self.index, self.epoch, |element| {
                element.spec.text.clear();
            })
    }

    async fn is_displayed(&self) -> PaseoResult<bool> {
        self.driver
            .with_element(&self.key, self.index, self.epoch, |element| {
                if element.polls_seen < element.spec.visible_after_polls {
                    element.polls_seen += 1;
                    return false;
                }
                element.spec.visible
            })
    }

    async fn is_enabled(&self) -> PaseoResult<bool> {
        self.driver
            .with_element(&self.key, self.index, self.epoch, |element| {
                element.spec.enabled
            })
    }

    async fn in_viewport(&self) -> PaseoResult<bool> {
        self.driver
            .with_element(&self.key, self.index, self.epoch, |element| {
                element.spec.in_viewport
            })
    }

    async fn text(&self) -> PaseoResult<String> {
        self.driver
            .with_element(&self.key, self.index, self.epoch, |element| {
                element.spec.text.clone()
            })
    }
}
