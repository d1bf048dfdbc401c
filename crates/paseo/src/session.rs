//! Browser session lifecycle and screenshot artifacts.
//!
//! A session owns exactly one driver and one artifact directory.
//! Sessions are the unit of isolation: concurrent scenarios each get
//! their own session, and nothing is shared between them.

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::driver::Driver;
use crate::result::{PaseoError, PaseoResult};

/// Named point in a scenario at which a screenshot is captured.
///
/// Checkpoint names order lexically so the artifact directory reads in
/// execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Checkpoint {
    /// Landing page finished loading
    HomeLoaded,
    /// Result grid before any scrolling
    BeforeScroll,
    /// After the nth swipe (1-based)
    AfterScroll(u32),
    /// A streamer page was reached
    StreamerSelected,
    /// A popup survived its dismissal wait
    PopupStuck,
}

impl Checkpoint {
    /// File stem for this checkpoint's screenshot
    #[must_use]
    pub fn file_stem(&self) -> String {
        match self {
            Self::HomeLoaded => "01_home_loaded".to_string(),
            Self::BeforeScroll => "02_before_scroll".to_string(),
            Self::AfterScroll(n) => format!("03_after_scroll_{n}"),
            Self::StreamerSelected => "04_streamer_selected".to_string(),
            Self::PopupStuck => "popup_stuck".to_string(),
        }
    }
}

/// One browser session with its artifact directory.
#[derive(Debug)]
pub struct Session<D: Driver> {
    id: Uuid,
    driver: D,
    artifact_dir: PathBuf,
    artifacts: Mutex<Vec<PathBuf>>,
    closed: Mutex<bool>,
}

impl<D: Driver> Session<D> {
    /// Start a session over the given driver, creating a per-session
    /// artifact directory under `artifact_root`.
    ///
    /// The directory name carries a timestamp and a short session id,
    /// so artifacts from concurrent or repeated runs never collide.
    ///
    /// # Errors
    ///
    /// Returns an error if the artifact directory cannot be created.
    pub fn new(driver: D, artifact_root: impl AsRef<Path>) -> PaseoResult<Self> {
        let id = Uuid::new_v4();
        let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        let short = &id.simple().to_string()[..8];
        let artifact_dir = artifact_root.as_ref().join(format!("{stamp}_{short}"));
        std::fs::create_dir_all(&artifact_dir)?;
        info!(session = %id, dir = %artifact_dir.display(), "session started");
        Ok(Self {
            id,
            driver,
            artifact_dir,
            artifacts: Mutex::new(Vec::new()),
            closed: Mutex::new(false),
        })
    }

    /// The session id
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// The driver backing this session
    pub const fn driver(&self) -> &D {
        &self.driver
    }

    /// This session's artifact directory
    #[must_use]
    pub fn artifact_dir(&self) -> &Path {
        &self.artifact_dir
    }

    /// Capture a screenshot at a checkpoint and journal its path.
    ///
    /// # Errors
    ///
    /// Returns an error if the capture or the file write fails.
    pub async fn capture(&self, checkpoint: Checkpoint) -> PaseoResult<PathBuf> {
        let path = self
            .artifact_dir
            .join(format!("{}.png", checkpoint.file_stem()));
        self.driver.screenshot(&path).await?;
        info!(checkpoint = ?checkpoint, path = %path.display(), "screenshot captured");
        self.artifacts
            .lock()
            .map_err(|_| PaseoError::Driver {
                message: "artifact journal poisoned".to_string(),
            })?
            .push(path.clone());
        Ok(path)
    }

    /// Paths of all screenshots captured so far, in capture order
    #[must_use]
    pub fn artifacts(&self) -> Vec<PathBuf> {
        self.artifacts
            .lock()
            .map(|journal| journal.clone())
            .unwrap_or_default()
    }

    /// The most recent artifact, if any
    #[must_use]
    pub fn last_artifact(&self) -> Option<PathBuf> {
        self.artifacts
            .lock()
            .ok()
            .and_then(|journal| journal.last().cloned())
    }

    /// Shut the session down, quitting the underlying driver.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver fails to quit.
    pub async fn close(&self) -> PaseoResult<()> {
        self.driver.quit().await?;
        if let Ok(mut closed) = self.closed.lock() {
            *closed = true;
        }
        info!(session = %self.id, "session closed");
        Ok(())
    }
}

impl<D: Driver> Drop for Session<D> {
    fn drop(&mut self) {
        let closed = self.closed.lock().map(|c| *c).unwrap_or(false);
        if !closed {
            // Drop is sync; the browser process is left to the OS
            warn!(session = %self.id, "session dropped without close()");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::testkit::FakeDriver;

    mod checkpoint_tests {
        use super::*;

        #[test]
        fn test_file_stems_order_lexically() {
            let stems = [
                Checkpoint::HomeLoaded.file_stem(),
                Checkpoint::BeforeScroll.file_stem(),
                Checkpoint::AfterScroll(1).file_stem(),
                Checkpoint::StreamerSelected.file_stem(),
            ];
            let mut sorted = stems.clone();
            sorted.sort();
            assert_eq!(stems.as_slice(), sorted.as_slice());
        }

        #[test]
        fn test_after_scroll_carries_index() {
            assert_eq!(Checkpoint::AfterScroll(2).file_stem(), "03_after_scroll_2");
        }
    }

    mod session_tests {
        use super::*;

        #[tokio::test]
        async fn test_capture_journals_paths_in_order() {
            let root = tempfile::tempdir().unwrap();
            let session = Session::new(FakeDriver::new("https://m.twitch.tv/"), root.path()).unwrap();

            let first = session.capture(Checkpoint::HomeLoaded).await.unwrap();
            let second = session.capture(Checkpoint::BeforeScroll).await.unwrap();

            assert!(first.exists());
            assert!(second.exists());
            assert_eq!(session.artifacts(), vec![first, second.clone()]);
            assert_eq!(session.last_artifact(), Some(second));
            session.close().await.unwrap();
        }

        #[tokio::test]
        async fn test_sessions_get_distinct_artifact_dirs() {
            let root = tempfile::tempdir().unwrap();
            let a = Session::new(FakeDriver::new("x"), root.path()).unwrap();
            let b = Session::new(FakeDriver::new("x"), root.path()).unwrap();
            assert_ne!(a.artifact_dir(), b.artifact_dir());
            a.close().await.unwrap();
            b.close().await.unwrap();
        }

        #[tokio::test]
        async fn test_close_quits_driver() {
            let root = tempfile::tempdir().unwrap();
            let driver = FakeDriver::new("x");
            let session = Session::new(driver.clone(), root.path()).unwrap();
            session.close().await.unwrap();
            assert!(driver.quit_called());
        }
    }
}
