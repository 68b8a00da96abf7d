//! Capture pipeline: frame acquisition, face-assisted auto capture, and
//! snapshot production.

pub mod camera;
pub mod detector;
pub mod session;

pub use camera::{Camera, FacingMode, FolderCamera, FrameSource, StreamStartup};
pub use detector::{DetectorBackend, FaceBox, FaceDetector};
pub use session::{AlignmentConfig, CaptureSession, SessionState, TickOutcome};

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, GenericImageView};
use std::time::SystemTime;
use thiserror::Error;

/// JPEG quality for produced snapshots.
pub const JPEG_QUALITY: u8 = 92;

/// Failures along the capture path. Every variant is recoverable: the UI
/// reports the message and stays interactive.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("camera could not be started: {0}")]
    CameraUnavailable(String),
    #[error("camera is not ready yet, try again in a moment")]
    NotReady,
    #[error("failed to encode snapshot")]
    Encode(#[from] image::ImageError),
    #[error("failed to save photo: {0}")]
    Storage(#[source] anyhow::Error),
}

/// A single video frame from a frame source.
#[derive(Debug, Clone)]
pub struct Frame {
    pub image: DynamicImage,
    /// Source-side capture time; used only to skip re-evaluating a frame
    /// the alignment loop has already seen.
    pub timestamp: SystemTime,
}

/// Rasterize a frame to a JPEG blob at the camera's native resolution.
///
/// Front-camera frames are mirrored horizontally so the saved photo matches
/// the live preview; rear frames are stored as-is.
pub fn snapshot_jpeg(frame: &Frame, facing: FacingMode) -> Result<Vec<u8>, CaptureError> {
    let (w, h) = frame.image.dimensions();
    if w == 0 || h == 0 {
        return Err(CaptureError::NotReady);
    }

    let image = match facing {
        FacingMode::Front => frame.image.fliph(),
        FacingMode::Rear => frame.image.clone(),
    };

    let mut buf = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut buf, JPEG_QUALITY);
    image.write_with_encoder(encoder)?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    fn frame(w: u32, h: u32) -> Frame {
        let mut img = RgbImage::new(w, h);
        if w > 1 {
            // Asymmetric content so mirroring is observable.
            img.put_pixel(0, 0, image::Rgb([255, 0, 0]));
        }
        Frame {
            image: DynamicImage::ImageRgb8(img),
            timestamp: SystemTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn test_snapshot_produces_jpeg() {
        let blob = snapshot_jpeg(&frame(8, 8), FacingMode::Rear).unwrap();
        // JPEG SOI marker
        assert_eq!(&blob[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn test_front_facing_mirrors() {
        let f = frame(8, 8);
        let mirrored = f.image.fliph();
        let direct = snapshot_jpeg(&f, FacingMode::Rear).unwrap();

        let mut buf = Vec::new();
        let encoder = JpegEncoder::new_with_quality(&mut buf, JPEG_QUALITY);
        mirrored.write_with_encoder(encoder).unwrap();

        assert_eq!(snapshot_jpeg(&f, FacingMode::Front).unwrap(), buf);
        assert_ne!(snapshot_jpeg(&f, FacingMode::Front).unwrap(), direct);
    }

    #[test]
    fn test_zero_dimension_frame_is_not_ready() {
        let f = Frame {
            image: DynamicImage::ImageRgb8(RgbImage::new(0, 0)),
            timestamp: SystemTime::UNIX_EPOCH,
        };
        assert!(matches!(
            snapshot_jpeg(&f, FacingMode::Rear),
            Err(CaptureError::NotReady)
        ));
    }
}
