use std::path::Path;
use std::sync::Arc;

use image::{imageops, DynamicImage};
use rand::{seq::IndexedRandom, Rng};

use super::{
    mean_luminance, to_luminance, CascadeDetector, DetectParams, DetectorError, RegionDetector,
};
use crate::models::MoodKey;

/// Faces brighter than this read as `excited` when smiling, `happy` otherwise
pub const SMILE_BRIGHTNESS: f64 = 100.0;
/// Non-smiling faces darker than this read as `sad`
pub const DARK_FACE: f64 = 70.0;
/// Non-smiling faces brighter than this read as `excited`
pub const BRIGHT_FACE: f64 = 130.0;

pub const SMILE_BRIGHT_CONFIDENCE: f64 = 0.85;
pub const SMILE_DIM_CONFIDENCE: f64 = 0.80;
pub const DARK_CONFIDENCE: f64 = 0.75;
pub const BRIGHT_CONFIDENCE: f64 = 0.70;
pub const AMBIGUOUS_CONFIDENCE: f64 = 0.72;
pub const FALLBACK_CONFIDENCE: f64 = 0.65;

/// Picked from when the signals are inconclusive
pub const AMBIGUOUS_MOODS: [MoodKey; 3] = [MoodKey::Relaxed, MoodKey::Thoughtful, MoodKey::Romantic];
/// Picked from when the detectors fail
pub const FALLBACK_MOODS: [MoodKey; 3] = [MoodKey::Happy, MoodKey::Relaxed, MoodKey::Thoughtful];

/// Outcome of classifying one frame
#[derive(Debug, Clone, PartialEq)]
pub enum EmotionReading {
    Detected {
        mood: MoodKey,
        confidence: f64,
    },
    NoFace,
    /// The detectors failed; the mood is a guess
    Degraded {
        mood: MoodKey,
        confidence: f64,
        reason: String,
    },
}

/// Maps the two face signals to a mood. First matching row wins.
pub fn decide<R: Rng + ?Sized>(smiling: bool, luminance: f64, rng: &mut R) -> (MoodKey, f64) {
    if smiling {
        if luminance > SMILE_BRIGHTNESS {
            (MoodKey::Excited, SMILE_BRIGHT_CONFIDENCE)
        } else {
            (MoodKey::Happy, SMILE_DIM_CONFIDENCE)
        }
    } else if luminance < DARK_FACE {
        (MoodKey::Sad, DARK_CONFIDENCE)
    } else if luminance > BRIGHT_FACE {
        (MoodKey::Excited, BRIGHT_CONFIDENCE)
    } else {
        let mood = AMBIGUOUS_MOODS
            .choose(rng)
            .copied()
            .unwrap_or(MoodKey::Relaxed);
        (mood, AMBIGUOUS_CONFIDENCE)
    }
}

fn fallback<R: Rng + ?Sized>(rng: &mut R, reason: String) -> EmotionReading {
    EmotionReading::Degraded {
        mood: FALLBACK_MOODS.choose(rng).copied().unwrap_or(MoodKey::Happy),
        confidence: FALLBACK_CONFIDENCE,
        reason,
    }
}

#[derive(Clone)]
pub struct Detectors {
    pub face: Arc<dyn RegionDetector>,
    pub smile: Arc<dyn RegionDetector>,
}

/// Face/smile heuristic classifier.
///
/// Built once at startup and shared read-only. When the detectors could not be
/// loaded the classifier stays usable and every reading is `Degraded`.
#[derive(Clone)]
pub struct EmotionClassifier {
    detectors: Result<Detectors, String>,
}

impl EmotionClassifier {
    pub fn new(face: Arc<dyn RegionDetector>, smile: Arc<dyn RegionDetector>) -> Self {
        Self {
            detectors: Ok(Detectors { face, smile }),
        }
    }

    /// A classifier whose every reading is degraded
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            detectors: Err(reason.into()),
        }
    }

    /// Loads the stock face and smile cascades. Load failures are logged and
    /// leave the classifier in degraded mode rather than failing startup.
    pub fn from_cascade_files(face_path: impl AsRef<Path>, smile_path: impl AsRef<Path>) -> Self {
        let loaded = CascadeDetector::from_file(face_path, DetectParams::FACE).and_then(|face| {
            let smile = CascadeDetector::from_file(smile_path, DetectParams::SMILE)?;
            Ok((face, smile))
        });

        match loaded {
            Ok((face, smile)) => {
                tracing::info!("Emotion cascades loaded");
                Self::new(Arc::new(face), Arc::new(smile))
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    "Emotion cascades unavailable, mood detection degraded \
                     (scripts/fetch_cascades.sh installs the stock ones)"
                );
                Self::unavailable(e.to_string())
            }
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.detectors.is_err()
    }

    pub fn classify<R: Rng + ?Sized>(&self, frame: &DynamicImage, rng: &mut R) -> EmotionReading {
        match self.read_face(frame, rng) {
            Ok(Some((mood, confidence))) => EmotionReading::Detected { mood, confidence },
            Ok(None) => EmotionReading::NoFace,
            Err(e) => {
                tracing::warn!(error = %e, "Emotion detection failed, falling back to a guess");
                fallback(rng, e.to_string())
            }
        }
    }

    fn read_face<R: Rng + ?Sized>(
        &self,
        frame: &DynamicImage,
        rng: &mut R,
    ) -> Result<Option<(MoodKey, f64)>, DetectorError> {
        let detectors = self
            .detectors
            .as_ref()
            .map_err(|reason| DetectorError::Unavailable(reason.clone()))?;

        let gray = to_luminance(frame);
        let Some(face) = detectors.face.detect(&gray)?.into_iter().next() else {
            return Ok(None);
        };

        let crop = imageops::crop_imm(&gray, face.x, face.y, face.width, face.height).to_image();
        let luminance = mean_luminance(&crop).ok_or(DetectorError::EmptyRegion)?;
        let smiling = !detectors.smile.detect(&crop)?.is_empty();

        tracing::debug!(
            face = ?face,
            smiling,
            luminance,
            "Face signals extracted"
        );

        Ok(Some(decide(smiling, luminance, rng)))
    }
}
