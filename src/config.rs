//! Dataset configuration.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{DatasetError, Result};

/// Which split of the dataset to load. Train enables the random transforms,
/// val and test run identity transforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Subset {
    Train,
    Val,
    Test,
}

impl Subset {
    pub fn csv_name(&self) -> &'static str {
        match self {
            Subset::Train => "train.csv",
            Subset::Val => "val.csv",
            Subset::Test => "test.csv",
        }
    }

    pub fn is_train(&self) -> bool {
        matches!(self, Subset::Train)
    }
}

/// Configuration for a place-recognition dataset.
///
/// Optional fields are explicit here and validated once in
/// [`crate::dataset::Dataset::new`], instead of being probed at runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// Root directory containing one subdirectory per track plus the
    /// per-subset metadata CSVs.
    pub dataset_root: PathBuf,
    pub subset: Subset,
    /// Modality names to load, e.g. `["image_lb3_Cam0", "pointcloud_lidar"]`.
    pub data_to_load: Vec<String>,
    /// UTM distance threshold for positive pairs, meters.
    #[serde(default = "default_positive_threshold")]
    pub positive_threshold: f64,
    /// UTM distance threshold below which a pair is not a negative, meters.
    #[serde(default = "default_negative_threshold")]
    pub negative_threshold: f64,
    /// Images subdirectory inside each track. Required when any image
    /// modality is requested.
    #[serde(default)]
    pub images_dirname: Option<String>,
    /// Masks subdirectory inside each track. Required when any mask
    /// modality is requested.
    #[serde(default = "default_masks_dirname")]
    pub masks_dirname: Option<String>,
    /// Point-clouds subdirectory inside each track.
    #[serde(default = "default_pointclouds_dirname")]
    pub pointclouds_dirname: Option<String>,
    /// Values per point record in the `.bin` files: 3 (xyz) or 4
    /// (xyz + intensity).
    #[serde(default = "default_point_record_width")]
    pub point_record_width: usize,
    /// Voxel cell size for point-cloud quantization.
    #[serde(default = "default_quantization_size")]
    pub pointcloud_quantization_size: f32,
    /// Drop points whose Euclidean norm exceeds this bound.
    #[serde(default)]
    pub max_point_distance: Option<f32>,
    /// Drop points with any coordinate outside `[-bound, bound]`.
    #[serde(default)]
    pub max_point_coord: Option<f32>,
    /// Spherical point coordinates. Accepted but not implemented.
    #[serde(default)]
    pub spherical_coords: bool,
    /// Use the recorded intensity as the per-point feature instead of 1.0.
    /// Requires width-4 point records.
    #[serde(default)]
    pub use_intensity_values: bool,
}

fn default_positive_threshold() -> f64 {
    10.0
}

fn default_negative_threshold() -> f64 {
    50.0
}

fn default_masks_dirname() -> Option<String> {
    Some("segmentation_masks".to_string())
}

fn default_pointclouds_dirname() -> Option<String> {
    Some("velodyne_data".to_string())
}

fn default_point_record_width() -> usize {
    4
}

fn default_quantization_size() -> f32 {
    0.01
}

impl DatasetConfig {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        serde_json::from_str(&contents).map_err(|e| DatasetError::Decode {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_with_defaults() {
        let cfg: DatasetConfig = serde_json::from_str(
            r#"{
                "dataset_root": "/data/nclt",
                "subset": "train",
                "data_to_load": ["pointcloud_lidar"]
            }"#,
        )
        .unwrap();
        assert_eq!(cfg.subset, Subset::Train);
        assert_eq!(cfg.positive_threshold, 10.0);
        assert_eq!(cfg.negative_threshold, 50.0);
        assert_eq!(cfg.pointclouds_dirname.as_deref(), Some("velodyne_data"));
        assert_eq!(cfg.pointcloud_quantization_size, 0.01);
        assert_eq!(cfg.point_record_width, 4);
        assert!(cfg.images_dirname.is_none());
        assert!(!cfg.use_intensity_values);
    }

    #[test]
    fn subset_csv_names() {
        assert_eq!(Subset::Train.csv_name(), "train.csv");
        assert_eq!(Subset::Val.csv_name(), "val.csv");
        assert_eq!(Subset::Test.csv_name(), "test.csv");
        assert!(Subset::Train.is_train());
        assert!(!Subset::Test.is_train());
    }
}
