//! Camera capability boundary.
//!
//! The capture pipeline never talks to a device API directly; it consumes
//! the [`Camera`]/[`FrameSource`] traits. The shipped implementation watches
//! a directory that frames land in (e.g. a folder a phone syncs into), one
//! directory per facing mode. A real device backend would implement the same
//! pair.

use anyhow::{anyhow, Result};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use walkdir::WalkDir;

use super::{CaptureError, Frame};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FacingMode {
    Front,
    Rear,
}

impl FacingMode {
    pub fn toggled(self) -> Self {
        match self {
            FacingMode::Front => FacingMode::Rear,
            FacingMode::Rear => FacingMode::Front,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FacingMode::Front => "front",
            FacingMode::Rear => "rear",
        }
    }
}

/// Outcome of stream acquisition: which of the two attempts succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamStartup {
    /// The requested facing mode opened.
    Primary,
    /// Rear was requested but unavailable; front opened instead.
    FellBackToFront,
}

/// A live frame source for one facing mode.
pub trait FrameSource: std::fmt::Debug {
    fn facing(&self) -> FacingMode;

    /// The newest available frame, or `None` when nothing has arrived yet
    /// or the source is stopped.
    fn poll_frame(&mut self) -> Result<Option<Frame>>;

    /// Release the underlying device. Idempotent; must be called on every
    /// teardown path and before opening a stream with a different facing.
    fn stop(&mut self);
}

/// Opens frame sources for a facing mode.
pub trait Camera {
    fn open(&self, facing: FacingMode) -> Result<Box<dyn FrameSource>>;
}

/// Request a stream, falling back from rear to front once.
///
/// Rear-camera unavailability is non-fatal: the caller surfaces a notice and
/// continues on the front camera. Front-camera failure (or double failure)
/// is a [`CaptureError::CameraUnavailable`].
pub fn open_with_fallback(
    camera: &dyn Camera,
    facing: FacingMode,
) -> Result<(Box<dyn FrameSource>, StreamStartup), CaptureError> {
    match camera.open(facing) {
        Ok(source) => Ok((source, StreamStartup::Primary)),
        Err(err) if facing == FacingMode::Rear => {
            tracing::warn!(error = %err, "Rear camera unavailable, trying front");
            match camera.open(FacingMode::Front) {
                Ok(source) => Ok((source, StreamStartup::FellBackToFront)),
                Err(err) => Err(CaptureError::CameraUnavailable(err.to_string())),
            }
        }
        Err(err) => Err(CaptureError::CameraUnavailable(err.to_string())),
    }
}

/// Directory-watching camera: each facing mode maps to a directory whose
/// newest image file is the current frame.
pub struct FolderCamera {
    front_dir: PathBuf,
    rear_dir: Option<PathBuf>,
}

impl FolderCamera {
    pub fn new(front_dir: PathBuf, rear_dir: Option<PathBuf>) -> Self {
        Self { front_dir, rear_dir }
    }
}

impl Camera for FolderCamera {
    fn open(&self, facing: FacingMode) -> Result<Box<dyn FrameSource>> {
        let dir = match facing {
            FacingMode::Front => self.front_dir.clone(),
            FacingMode::Rear => self
                .rear_dir
                .clone()
                .ok_or_else(|| anyhow!("no rear frame directory configured"))?,
        };
        if !dir.is_dir() {
            return Err(anyhow!("frame directory does not exist: {}", dir.display()));
        }
        Ok(Box::new(FolderFrameSource {
            dir,
            facing,
            stopped: false,
        }))
    }
}

#[derive(Debug)]
struct FolderFrameSource {
    dir: PathBuf,
    facing: FacingMode,
    stopped: bool,
}

const FRAME_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp"];

fn is_frame_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .map(|e| FRAME_EXTENSIONS.contains(&e.as_str()))
        .unwrap_or(false)
}

impl FrameSource for FolderFrameSource {
    fn facing(&self) -> FacingMode {
        self.facing
    }

    fn poll_frame(&mut self) -> Result<Option<Frame>> {
        if self.stopped {
            return Ok(None);
        }

        let mut newest: Option<(PathBuf, SystemTime)> = None;
        for entry in WalkDir::new(&self.dir)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if !path.is_file() || !is_frame_file(path) {
                continue;
            }
            let mtime = match entry.metadata().ok().and_then(|m| m.modified().ok()) {
                Some(t) => t,
                None => continue,
            };
            if newest.as_ref().map(|(_, t)| mtime > *t).unwrap_or(true) {
                newest = Some((path.to_path_buf(), mtime));
            }
        }

        let Some((path, mtime)) = newest else {
            return Ok(None);
        };

        let image = image::open(&path)
            .map_err(|e| anyhow!("failed to decode frame {}: {e}", path.display()))?;
        Ok(Some(Frame {
            image,
            timestamp: mtime,
        }))
    }

    fn stop(&mut self) {
        self.stopped = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct StubSource(FacingMode);

    impl FrameSource for StubSource {
        fn facing(&self) -> FacingMode {
            self.0
        }
        fn poll_frame(&mut self) -> Result<Option<Frame>> {
            Ok(None)
        }
        fn stop(&mut self) {}
    }

    /// Camera that only has a front lens.
    struct FrontOnly;

    impl Camera for FrontOnly {
        fn open(&self, facing: FacingMode) -> Result<Box<dyn FrameSource>> {
            match facing {
                FacingMode::Front => Ok(Box::new(StubSource(facing))),
                FacingMode::Rear => Err(anyhow!("no rear camera")),
            }
        }
    }

    struct NoCamera;

    impl Camera for NoCamera {
        fn open(&self, _facing: FacingMode) -> Result<Box<dyn FrameSource>> {
            Err(anyhow!("no camera at all"))
        }
    }

    #[test]
    fn test_rear_falls_back_to_front() {
        let (source, startup) = open_with_fallback(&FrontOnly, FacingMode::Rear).unwrap();
        assert_eq!(startup, StreamStartup::FellBackToFront);
        assert_eq!(source.facing(), FacingMode::Front);
    }

    #[test]
    fn test_front_request_does_not_fall_back() {
        let (_, startup) = open_with_fallback(&FrontOnly, FacingMode::Front).unwrap();
        assert_eq!(startup, StreamStartup::Primary);
    }

    #[test]
    fn test_total_failure_is_camera_unavailable() {
        let err = open_with_fallback(&NoCamera, FacingMode::Rear).unwrap_err();
        assert!(matches!(err, CaptureError::CameraUnavailable(_)));
    }

    #[test]
    fn test_folder_source_serves_newest_frame() {
        let dir = tempfile::tempdir().unwrap();
        let img = image::RgbImage::new(4, 4);
        img.save(dir.path().join("old.png")).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(20));
        img.save(dir.path().join("new.png")).unwrap();

        let camera = FolderCamera::new(dir.path().to_path_buf(), None);
        let mut source = camera.open(FacingMode::Front).unwrap();
        let frame = source.poll_frame().unwrap().unwrap();
        use image::GenericImageView;
        assert_eq!(frame.image.dimensions(), (4, 4));

        source.stop();
        source.stop(); // idempotent
        assert!(source.poll_frame().unwrap().is_none());
    }

    #[test]
    fn test_folder_camera_without_rear_dir_rejects_rear() {
        let dir = tempfile::tempdir().unwrap();
        let camera = FolderCamera::new(dir.path().to_path_buf(), None);
        assert!(camera.open(FacingMode::Rear).is_err());
    }
}
