use std::path::Path;
use image::{DynamicImage, GenericImageView};

use crate::error::ClassifyError;
use crate::features::{bound_image, dominant_colors, Algorithm};
use crate::groups::{assign_group, default_groups, ColorGroup, DEFAULT_MIN_CONFIDENCE};
use crate::ClassificationResult;

/// Turns one image path into a classification.
///
/// Implementations must be stateless across calls: the pool invokes them
/// concurrently from every worker.
pub trait Classifier: Send + Sync {
    fn classify(&self, path: &Path) -> Result<ClassificationResult, ClassifyError>;

    /// Result recorded when `classify` fails or panics
    fn on_failure(&self, _path: &Path, error: &ClassifyError) -> ClassificationResult {
        ClassificationResult::Unreadable {
            reason: error.to_string(),
        }
    }
}

impl<F> Classifier for F
where
    F: Fn(&Path) -> Result<ClassificationResult, ClassifyError> + Send + Sync,
{
    fn classify(&self, path: &Path) -> Result<ClassificationResult, ClassifyError> {
        self(path)
    }
}

fn open_image(path: &Path) -> Result<DynamicImage, ClassifyError> {
    let image = image::ImageReader::open(path)?
        .with_guessed_format()?
        .decode()?;
    if image.width() == 0 || image.height() == 0 {
        return Err(ClassifyError::Empty);
    }
    Ok(image)
}

/// Fully decodes the file and reports its dimensions
#[derive(Debug, Default, Clone, Copy)]
pub struct ValidityClassifier;

impl Classifier for ValidityClassifier {
    fn classify(&self, path: &Path) -> Result<ClassificationResult, ClassifyError> {
        let image = open_image(path)?;
        let (width, height) = image.dimensions();
        Ok(ClassificationResult::Validity {
            is_valid: true,
            width,
            height,
        })
    }

    fn on_failure(&self, _path: &Path, _error: &ClassifyError) -> ClassificationResult {
        ClassificationResult::Validity {
            is_valid: false,
            width: 0,
            height: 0,
        }
    }
}

/// `1 - mean luma / 255`, so 0 is white and 1 is black
#[derive(Debug, Default, Clone, Copy)]
pub struct DarknessClassifier;

impl DarknessClassifier {
    pub fn darkness(image: &DynamicImage) -> f64 {
        let gray = image.to_luma8();
        let pixels = gray.as_raw();
        if pixels.is_empty() {
            return 0.0;
        }
        let sum: u64 = pixels.iter().map(|&v| v as u64).sum();
        let mean = sum as f64 / pixels.len() as f64;
        (1.0 - mean / 255.0).clamp(0.0, 1.0)
    }
}

impl Classifier for DarknessClassifier {
    fn classify(&self, path: &Path) -> Result<ClassificationResult, ClassifyError> {
        let image = open_image(path)?;
        Ok(ClassificationResult::DarknessScore {
            score: Self::darkness(&image),
        })
    }
}

/// Tunables for color grouping
#[derive(Debug, Clone)]
pub struct GroupingConfig {
    pub algorithm: Algorithm,
    /// Number of dominant colors extracted per image
    pub colors: usize,
    pub min_confidence: f64,
    /// Images are shrunk to fit these bounds before extraction
    pub max_width: u32,
    pub max_height: u32,
    pub groups: Vec<ColorGroup>,
}

impl Default for GroupingConfig {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::KMeans,
            colors: 5,
            min_confidence: DEFAULT_MIN_CONFIDENCE,
            max_width: 800,
            max_height: 600,
            groups: default_groups(),
        }
    }
}

/// Assigns each image to its best-matching color group
#[derive(Debug, Clone, Default)]
pub struct GroupClassifier {
    config: GroupingConfig,
}

impl GroupClassifier {
    pub fn new(config: GroupingConfig) -> Self {
        Self { config }
    }

    pub fn group_names(&self) -> Vec<String> {
        self.config.groups.iter().map(|g| g.name.clone()).collect()
    }

    pub fn config(&self) -> &GroupingConfig {
        &self.config
    }
}

impl Classifier for GroupClassifier {
    fn classify(&self, path: &Path) -> Result<ClassificationResult, ClassifyError> {
        let image = open_image(path)?;
        let image = bound_image(image, self.config.max_width, self.config.max_height).to_rgb8();
        let colors = dominant_colors(&image, self.config.algorithm, self.config.colors);
        let matched = assign_group(&colors, &self.config.groups, self.config.min_confidence);

        Ok(ClassificationResult::GroupAssignment {
            group_name: matched.group_name,
            group_id: matched.group_id,
            score: matched.score,
        })
    }
}
