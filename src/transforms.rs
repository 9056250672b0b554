//! Train / eval transform pipelines.
//!
//! Mode is fixed at construction. Eval mode is always the identity apart from
//! tensor layout and normalization; train mode adds per-sample coordinate
//! jitter and, at the batch level, one shared rigid rotation for the whole
//! concatenated cloud.

use image::{GrayImage, RgbImage};
use nalgebra::{Rotation3, Vector3};
use ndarray::{Array2, Array3, Axis};
use rand::Rng;

const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Per-point jitter amplitude in train mode, meters.
const CLOUD_JITTER: f32 = 0.01;

/// RGB image to a normalized `(3, H, W)` float tensor.
#[derive(Debug, Clone, Copy)]
pub struct ImageTransform {
    train: bool,
}

impl ImageTransform {
    pub fn new(train: bool) -> Self {
        Self { train }
    }

    pub fn apply(&self, image: &RgbImage) -> Array3<f32> {
        let _ = self.train;
        let (w, h) = image.dimensions();
        let mut out = Array3::zeros((3, h as usize, w as usize));
        for (x, y, pixel) in image.enumerate_pixels() {
            for c in 0..3 {
                let value = pixel.0[c] as f32 / 255.0;
                out[[c, y as usize, x as usize]] = (value - IMAGENET_MEAN[c]) / IMAGENET_STD[c];
            }
        }
        out
    }
}

/// Semantic mask to a `(1, H, W)` class-id tensor.
#[derive(Debug, Clone, Copy)]
pub struct MaskTransform {
    train: bool,
}

impl MaskTransform {
    pub fn new(train: bool) -> Self {
        Self { train }
    }

    pub fn apply(&self, mask: &GrayImage) -> Array3<f32> {
        let _ = self.train;
        let (w, h) = mask.dimensions();
        let mut out = Array3::zeros((1, h as usize, w as usize));
        for (x, y, pixel) in mask.enumerate_pixels() {
            out[[0, y as usize, x as usize]] = pixel.0[0] as f32;
        }
        out
    }
}

/// Per-sample cloud transform: coordinate jitter in train mode, identity in
/// eval mode.
#[derive(Debug, Clone, Copy)]
pub struct CloudTransform {
    train: bool,
}

impl CloudTransform {
    pub fn new(train: bool) -> Self {
        Self { train }
    }

    pub fn apply(&self, mut coords: Array2<f32>) -> Array2<f32> {
        if self.train {
            let mut rng = rand::thread_rng();
            for value in coords.iter_mut() {
                *value += rng.gen_range(-CLOUD_JITTER..=CLOUD_JITTER);
            }
        }
        coords
    }
}

/// Batch-level cloud transform: one random rotation about the vertical axis
/// applied to the entire concatenated point tensor, so every point in the
/// batch receives the same rigid transform. Identity in eval mode.
#[derive(Debug, Clone, Copy)]
pub struct CloudSetTransform {
    train: bool,
}

impl CloudSetTransform {
    pub fn new(train: bool) -> Self {
        Self { train }
    }

    pub fn apply(&self, mut coords: Array2<f32>) -> Array2<f32> {
        if !self.train {
            return coords;
        }
        let angle = rand::thread_rng().gen_range(-std::f32::consts::PI..std::f32::consts::PI);
        let rotation = Rotation3::from_axis_angle(&Vector3::z_axis(), angle);
        for mut row in coords.axis_iter_mut(Axis(0)) {
            let rotated = rotation * Vector3::new(row[0], row[1], row[2]);
            row[0] = rotated.x;
            row[1] = rotated.y;
            row[2] = rotated.z;
        }
        coords
    }
}
