//! Closed enumeration of modalities and sample data keys.
//!
//! The on-disk naming convention uses string keys (`"image_lb3_Cam0"`,
//! `"pointcloud_lidar_coords"`, ...). They are parsed into variants once, at
//! configuration time for `data_to_load` entries and once per key when a
//! batch is assembled, so the dispatch rules live in one place.

use crate::error::{DatasetError, Result};

/// One loadable modality, as named in `data_to_load`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Modality {
    /// Camera image, e.g. `image_lb3_Cam0`. Carries the camera name.
    Image(String),
    /// Semantic segmentation mask for a camera, e.g. `mask_lb3_Cam0`.
    Mask(String),
    /// LiDAR point cloud.
    PointCloudLidar,
}

impl Modality {
    pub fn parse(name: &str) -> Result<Self> {
        if name == "pointcloud_lidar" {
            Ok(Modality::PointCloudLidar)
        } else if let Some(cam) = name.strip_prefix("image_") {
            if cam.is_empty() {
                return Err(DatasetError::UnsupportedKey(name.to_string()));
            }
            Ok(Modality::Image(cam.to_string()))
        } else if let Some(cam) = name.strip_prefix("mask_") {
            if cam.is_empty() {
                return Err(DatasetError::UnsupportedKey(name.to_string()));
            }
            Ok(Modality::Mask(cam.to_string()))
        } else {
            Err(DatasetError::UnsupportedKey(name.to_string()))
        }
    }

    /// Metadata table column holding this modality's filename key.
    pub fn table_column(&self) -> &str {
        match self {
            Modality::Image(cam) | Modality::Mask(cam) => cam,
            Modality::PointCloudLidar => "pointcloud",
        }
    }
}

/// A key in a per-sample tensor map, parsed for batch dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataKey {
    /// Camera image tensor, stacked into `images_<cam>`.
    Image(String),
    /// Semantic mask tensor, stacked into `masks_<cam>`.
    Mask(String),
    /// Point-cloud coordinates, consumed by the cloud batching procedure.
    CloudCoords,
    /// Point-cloud features, consumed alongside the coordinates.
    CloudFeats,
}

impl DataKey {
    pub fn parse(key: &str) -> Result<Self> {
        match key {
            "pointcloud_lidar_coords" => Ok(DataKey::CloudCoords),
            "pointcloud_lidar_feats" => Ok(DataKey::CloudFeats),
            _ => match Modality::parse(key)? {
                Modality::Image(cam) => Ok(DataKey::Image(cam)),
                Modality::Mask(cam) => Ok(DataKey::Mask(cam)),
                // bare "pointcloud_lidar" is not a sample key
                Modality::PointCloudLidar => Err(DatasetError::UnsupportedKey(key.to_string())),
            },
        }
    }

    /// Name of the batch tensor this key produces.
    pub fn batch_name(&self) -> String {
        match self {
            DataKey::Image(cam) => format!("images_{cam}"),
            DataKey::Mask(cam) => format!("masks_{cam}"),
            DataKey::CloudCoords => "pointclouds_lidar_coords".to_string(),
            DataKey::CloudFeats => "pointclouds_lidar_feats".to_string(),
        }
    }
}
