//! Per-sample value produced by the loader.

use std::collections::BTreeMap;

use ndarray::{Array1, ArrayD};

use crate::error::{DatasetError, Result};

/// One retrieved sample: the table index, the UTM position and the loaded
/// modality tensors keyed by name (`"image_<cam>"`, `"mask_<cam>"`,
/// `"pointcloud_lidar_coords"`, `"pointcloud_lidar_feats"`).
///
/// Immutable once produced; discarded after batching.
#[derive(Debug, Clone)]
pub struct Sample {
    pub idx: usize,
    /// `[northing, easting]`.
    pub utm: Array1<f64>,
    pub data: BTreeMap<String, ArrayD<f32>>,
}

impl Sample {
    pub fn new(idx: usize, northing: f64, easting: f64) -> Self {
        Self {
            idx,
            utm: Array1::from(vec![northing, easting]),
            data: BTreeMap::new(),
        }
    }

    /// Fetch a tensor that every sample in a batch is expected to carry.
    pub fn tensor(&self, key: &str) -> Result<&ArrayD<f32>> {
        self.data
            .get(key)
            .ok_or_else(|| DatasetError::InconsistentBatch {
                idx: self.idx,
                key: key.to_string(),
            })
    }
}
