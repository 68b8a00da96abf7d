//! Face detection for the auto-align assist (UltraFace via ONNX Runtime).
//!
//! Initialization is a two-attempt procedure: an accelerated session
//! configuration first, then a minimal CPU configuration. Total failure
//! disables auto-align only; manual capture never depends on this module.

use anyhow::{anyhow, Result};
use image::{DynamicImage, GenericImageView};
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Tensor;
use std::path::PathBuf;

/// A detected face bounding box in frame pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceBox {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl FaceBox {
    pub fn center(&self) -> (f32, f32) {
        (
            self.x as f32 + self.width as f32 / 2.0,
            self.y as f32 + self.height as f32 / 2.0,
        )
    }
}

/// Which of the two initialization attempts produced the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectorBackend {
    Accelerated,
    Minimal,
}

pub struct FaceDetector {
    session: Session,
    backend: DetectorBackend,
}

const MODEL_FILE: &str = "ultraface-320.onnx";
const MODEL_URL: &str =
    "https://github.com/onnx/models/raw/main/validated/vision/body_analysis/ultraface/models/version-RFB-320.onnx";

fn models_dir() -> Result<PathBuf> {
    let data_dir =
        dirs::data_local_dir().ok_or_else(|| anyhow!("Could not find local data directory"))?;
    let models_dir = data_dir.join("fitlapse").join("models");
    std::fs::create_dir_all(&models_dir)?;
    Ok(models_dir)
}

/// Download the detection model if it is not present yet.
fn ensure_model() -> Result<PathBuf> {
    let model_path = models_dir()?.join(MODEL_FILE);

    if !model_path.exists() {
        tracing::info!(model = MODEL_FILE, "Downloading face detection model...");
        let response = ureq::get(MODEL_URL)
            .call()
            .map_err(|e| anyhow!("Failed to download model: {}", e))?;

        let mut file = std::fs::File::create(&model_path)?;
        std::io::copy(&mut response.into_reader(), &mut file)?;
        tracing::info!(model = MODEL_FILE, path = ?model_path, "Model downloaded");
    }

    Ok(model_path)
}

impl FaceDetector {
    /// Two-attempt initialization: accelerated configuration, then minimal.
    pub fn init() -> Result<Self> {
        let model_path = ensure_model()?;

        match Self::build_session(&model_path, DetectorBackend::Accelerated) {
            Ok(session) => {
                tracing::info!("Face detector ready (accelerated)");
                Ok(Self {
                    session,
                    backend: DetectorBackend::Accelerated,
                })
            }
            Err(err) => {
                tracing::warn!(error = %err, "Accelerated detector init failed, retrying minimal");
                let session = Self::build_session(&model_path, DetectorBackend::Minimal)?;
                tracing::info!("Face detector ready (minimal fallback)");
                Ok(Self {
                    session,
                    backend: DetectorBackend::Minimal,
                })
            }
        }
    }

    fn build_session(model_path: &PathBuf, backend: DetectorBackend) -> Result<Session> {
        let builder = Session::builder().map_err(|e| anyhow::anyhow!(e.to_string()))?;
        let mut builder = match backend {
            DetectorBackend::Accelerated => builder
                .with_optimization_level(GraphOptimizationLevel::Level3)
                .map_err(|e| anyhow::anyhow!(e.to_string()))?
                .with_intra_threads(4)
                .map_err(|e| anyhow::anyhow!(e.to_string()))?,
            DetectorBackend::Minimal => builder
                .with_optimization_level(GraphOptimizationLevel::Disable)
                .map_err(|e| anyhow::anyhow!(e.to_string()))?
                .with_intra_threads(1)
                .map_err(|e| anyhow::anyhow!(e.to_string()))?,
        };
        builder
            .commit_from_file(model_path)
            .map_err(|e| anyhow::anyhow!(e.to_string()))
    }

    /// Which initialization attempt succeeded.
    pub fn backend(&self) -> DetectorBackend {
        self.backend
    }

    /// Detect faces in a frame, best detection first.
    pub fn detect(&mut self, image: &DynamicImage) -> Result<Vec<FaceBox>> {
        run_ultraface(&mut self.session, image)
    }
}

/// Run the UltraFace model over one frame.
fn run_ultraface(session: &mut Session, img: &DynamicImage) -> Result<Vec<FaceBox>> {
    const INPUT_WIDTH: u32 = 320;
    const INPUT_HEIGHT: u32 = 240;
    const CONFIDENCE_THRESHOLD: f32 = 0.7;
    const NMS_THRESHOLD: f32 = 0.3;

    let (orig_width, orig_height) = img.dimensions();

    // Resize to model input size (bilinear for speed; this runs every frame)
    let resized = img.resize_exact(
        INPUT_WIDTH,
        INPUT_HEIGHT,
        image::imageops::FilterType::Triangle,
    );
    let rgb = resized.to_rgb8();

    // NCHW, normalized to roughly [-1, 1]
    let mut input_data = vec![0.0f32; (3 * INPUT_HEIGHT * INPUT_WIDTH) as usize];
    let plane = (INPUT_HEIGHT * INPUT_WIDTH) as usize;
    for y in 0..INPUT_HEIGHT as usize {
        for x in 0..INPUT_WIDTH as usize {
            let pixel = rgb.get_pixel(x as u32, y as u32);
            let idx = y * INPUT_WIDTH as usize + x;
            input_data[idx] = (pixel[0] as f32 - 127.0) / 128.0;
            input_data[plane + idx] = (pixel[1] as f32 - 127.0) / 128.0;
            input_data[2 * plane + idx] = (pixel[2] as f32 - 127.0) / 128.0;
        }
    }

    let input_tensor = Tensor::from_array((
        [1usize, 3, INPUT_HEIGHT as usize, INPUT_WIDTH as usize],
        input_data.into_boxed_slice(),
    ))?;

    let outputs = session.run(ort::inputs!["input" => input_tensor])?;

    let scores_value = outputs
        .get("scores")
        .ok_or_else(|| anyhow!("No scores output"))?;
    let boxes_value = outputs
        .get("boxes")
        .ok_or_else(|| anyhow!("No boxes output"))?;

    let (scores_shape, scores_data) = scores_value.try_extract_tensor::<f32>()?;
    let (_boxes_shape, boxes_data) = boxes_value.try_extract_tensor::<f32>()?;

    // scores: [1, num_anchors, 2] (background, face)
    // boxes:  [1, num_anchors, 4] (x1, y1, x2, y2 normalized)
    let num_anchors = scores_shape[1] as usize;
    let mut detections = Vec::new();

    for i in 0..num_anchors {
        let confidence = scores_data[i * 2 + 1];
        if confidence <= CONFIDENCE_THRESHOLD {
            continue;
        }

        let x1 = (boxes_data[i * 4] * orig_width as f32) as i32;
        let y1 = (boxes_data[i * 4 + 1] * orig_height as f32) as i32;
        let x2 = (boxes_data[i * 4 + 2] * orig_width as f32) as i32;
        let y2 = (boxes_data[i * 4 + 3] * orig_height as f32) as i32;

        detections.push((
            FaceBox {
                x: x1.max(0),
                y: y1.max(0),
                width: (x2 - x1).max(1),
                height: (y2 - y1).max(1),
            },
            confidence,
        ));
    }

    Ok(nms(detections, NMS_THRESHOLD)
        .into_iter()
        .map(|(bbox, _)| bbox)
        .collect())
}

/// Non-maximum suppression over overlapping detections, best first.
fn nms(mut boxes: Vec<(FaceBox, f32)>, threshold: f32) -> Vec<(FaceBox, f32)> {
    boxes.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    let mut keep = Vec::new();
    let mut suppressed = vec![false; boxes.len()];

    for i in 0..boxes.len() {
        if suppressed[i] {
            continue;
        }
        keep.push(boxes[i]);
        for j in (i + 1)..boxes.len() {
            if !suppressed[j] && iou(&boxes[i].0, &boxes[j].0) > threshold {
                suppressed[j] = true;
            }
        }
    }

    keep
}

fn iou(a: &FaceBox, b: &FaceBox) -> f32 {
    let x1 = a.x.max(b.x);
    let y1 = a.y.max(b.y);
    let x2 = (a.x + a.width).min(b.x + b.width);
    let y2 = (a.y + a.height).min(b.y + b.height);

    let intersection = ((x2 - x1).max(0) * (y2 - y1).max(0)) as f32;
    let area_a = (a.width * a.height) as f32;
    let area_b = (b.width * b.height) as f32;
    let union = area_a + area_b - intersection;

    if union > 0.0 {
        intersection / union
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iou_identical_boxes() {
        let a = FaceBox { x: 0, y: 0, width: 10, height: 10 };
        assert!((iou(&a, &a) - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_iou_disjoint_boxes() {
        let a = FaceBox { x: 0, y: 0, width: 10, height: 10 };
        let b = FaceBox { x: 20, y: 20, width: 10, height: 10 };
        assert!((iou(&a, &b) - 0.0).abs() < 0.001);
    }

    #[test]
    fn test_nms_suppresses_overlap_keeps_best() {
        let strong = FaceBox { x: 0, y: 0, width: 10, height: 10 };
        let weak = FaceBox { x: 1, y: 1, width: 10, height: 10 };
        let far = FaceBox { x: 50, y: 50, width: 10, height: 10 };

        let kept = nms(vec![(weak, 0.8), (strong, 0.95), (far, 0.9)], 0.3);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].0, strong);
        assert_eq!(kept[1].0, far);
    }

    #[test]
    fn test_face_box_center() {
        let b = FaceBox { x: 10, y: 20, width: 30, height: 40 };
        assert_eq!(b.center(), (25.0, 40.0));
    }
}
