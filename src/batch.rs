//! Batch assembly: stack per-sample tensors, batch the point clouds into a
//! sparse coordinate/feature representation and derive the positive/negative
//! pair masks.

use std::collections::BTreeMap;

use ndarray::{concatenate, s, Array2, ArrayD, Axis, Ix2, IxDyn};

use crate::cloud::{batched_coordinates, sparse_quantize};
use crate::error::{DatasetError, Result};
use crate::index::PairIndex;
use crate::modality::DataKey;
use crate::sample::Sample;
use crate::transforms::CloudSetTransform;

/// One batched output tensor.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchTensor {
    F32(ArrayD<f32>),
    F64(ArrayD<f64>),
    I32(ArrayD<i32>),
}

/// An assembled batch. Row `r` of every tensor, and row/column `r` of both
/// masks, correspond to the `r`-th input sample.
#[derive(Debug, Clone)]
pub struct Batch {
    /// `"utms"`, `"images_<cam>"`, `"masks_<cam>"`,
    /// `"pointclouds_lidar_coords"`, `"pointclouds_lidar_feats"`.
    pub tensors: BTreeMap<String, BatchTensor>,
    pub positives_mask: Array2<bool>,
    pub negatives_mask: Array2<bool>,
}

/// Pack an ordered, non-empty list of samples into one batch.
///
/// Pure function of its inputs: the pair index is read-only and the only
/// mode dependence is the set transform's train/eval flag, fixed at
/// construction.
pub fn collate(
    samples: &[Sample],
    index: &PairIndex,
    set_transform: &CloudSetTransform,
    quantization_size: f32,
) -> Result<Batch> {
    if samples.is_empty() {
        return Err(DatasetError::EmptyBatch);
    }
    let indices: Vec<usize> = samples.iter().map(|s| s.idx).collect();
    let mut tensors = BTreeMap::new();

    let utms = stack_utms(samples);
    tensors.insert("utms".to_string(), BatchTensor::F64(utms.into_dyn()));

    for key in samples[0].data.keys() {
        match DataKey::parse(key)? {
            data_key @ (DataKey::Image(_) | DataKey::Mask(_)) => {
                let stacked = stack_fixed_shape(samples, key)?;
                tensors.insert(data_key.batch_name(), BatchTensor::F32(stacked));
            }
            DataKey::CloudCoords => {
                let (coords, feats) =
                    batch_clouds(samples, set_transform, quantization_size)?;
                tensors.insert(
                    "pointclouds_lidar_coords".to_string(),
                    BatchTensor::I32(coords.into_dyn()),
                );
                tensors.insert(
                    "pointclouds_lidar_feats".to_string(),
                    BatchTensor::F32(feats.into_dyn()),
                );
            }
            // consumed together with the coordinates
            DataKey::CloudFeats => {}
        }
    }

    let (positives_mask, negatives_mask) = pair_masks(&indices, index);
    Ok(Batch {
        tensors,
        positives_mask,
        negatives_mask,
    })
}

/// `(B, 2)` UTM positions, row order = input order.
fn stack_utms(samples: &[Sample]) -> Array2<f64> {
    let mut utms = Array2::zeros((samples.len(), 2));
    for (r, sample) in samples.iter().enumerate() {
        utms[[r, 0]] = sample.utm[0];
        utms[[r, 1]] = sample.utm[1];
    }
    utms
}

/// Stack fixed-shape tensors (images, masks) into `(B, ...)`. Every sample
/// must carry the key with an identical shape.
fn stack_fixed_shape(samples: &[Sample], key: &str) -> Result<ArrayD<f32>> {
    let first = samples[0].tensor(key)?;
    let item_shape = first.shape().to_vec();
    let mut out_shape = vec![samples.len()];
    out_shape.extend_from_slice(&item_shape);
    let mut values = Vec::with_capacity(out_shape.iter().product());
    for sample in samples {
        let tensor = sample.tensor(key)?;
        if tensor.shape() != item_shape.as_slice() {
            return Err(DatasetError::ShapeMismatch {
                key: key.to_string(),
                expected: item_shape,
                got: tensor.shape().to_vec(),
            });
        }
        values.extend(tensor.iter().copied());
    }
    let len = values.len();
    ArrayD::from_shape_vec(IxDyn(&out_shape), values).map_err(|_| DatasetError::ShapeMismatch {
        key: key.to_string(),
        expected: out_shape,
        got: vec![len],
    })
}

/// The point-cloud batching procedure: concatenate all samples' coordinates,
/// apply one shared transform to the whole tensor, split back along the
/// recorded point counts, quantize each chunk onto the voxel grid and emit
/// batched sparse coordinates plus matching feature rows.
fn batch_clouds(
    samples: &[Sample],
    set_transform: &CloudSetTransform,
    quantization_size: f32,
) -> Result<(Array2<i32>, Array2<f32>)> {
    let mut coords_list = Vec::with_capacity(samples.len());
    let mut feats_list: Vec<Array2<f32>> = Vec::with_capacity(samples.len());
    for sample in samples {
        let coords = as_2d(sample, "pointcloud_lidar_coords")?;
        if coords.ncols() != 3 {
            return Err(DatasetError::ShapeMismatch {
                key: "pointcloud_lidar_coords".to_string(),
                expected: vec![coords.nrows(), 3],
                got: coords.shape().to_vec(),
            });
        }
        let feats = as_2d(sample, "pointcloud_lidar_feats")?;
        if let Some(first) = feats_list.first() {
            let width = first.ncols();
            if feats.ncols() != width {
                return Err(DatasetError::ShapeMismatch {
                    key: "pointcloud_lidar_feats".to_string(),
                    expected: vec![feats.nrows(), width],
                    got: feats.shape().to_vec(),
                });
            }
        }
        coords_list.push(coords);
        feats_list.push(feats);
    }
    let n_points: Vec<usize> = coords_list.iter().map(Array2::nrows).collect();

    let views: Vec<_> = coords_list.iter().map(Array2::view).collect();
    let flat = concatenate(Axis(0), &views).map_err(|_| DatasetError::ShapeMismatch {
        key: "pointcloud_lidar_coords".to_string(),
        expected: vec![n_points.iter().sum(), 3],
        got: vec![],
    })?;
    // One transform for the entire batch, so every point gets the same
    // rigid parameterization.
    let flat = set_transform.apply(flat);

    let mut quantized_coords = Vec::with_capacity(samples.len());
    let mut quantized_feats = Vec::with_capacity(samples.len());
    let mut start = 0;
    for (n, feats) in n_points.iter().zip(&feats_list) {
        let chunk = flat.slice(s![start..start + n, ..]).to_owned();
        start += n;
        let (coords, feats) = sparse_quantize(&chunk, feats, quantization_size)?;
        quantized_coords.push(coords);
        quantized_feats.push(feats);
    }

    let batched = batched_coordinates(&quantized_coords);
    let feat_views: Vec<_> = quantized_feats.iter().map(Array2::view).collect();
    let batched_feats =
        concatenate(Axis(0), &feat_views).map_err(|_| DatasetError::ShapeMismatch {
            key: "pointcloud_lidar_feats".to_string(),
            expected: vec![batched.nrows(), 1],
            got: vec![],
        })?;
    Ok((batched, batched_feats))
}

fn as_2d(sample: &Sample, key: &str) -> Result<Array2<f32>> {
    sample
        .tensor(key)?
        .clone()
        .into_dimensionality::<Ix2>()
        .map_err(|_| DatasetError::ShapeMismatch {
            key: key.to_string(),
            expected: vec![0, 0],
            got: sample.data[key].shape().to_vec(),
        })
}

/// Build the `B×B` pair masks for an ordered index list.
///
/// `positives[r][c]` iff `indices[c]` is in the positive list of
/// `indices[r]`; `negatives[r][c]` iff `indices[c]` is outside the
/// nonnegative list. A pair of the same underlying sample is never a
/// negative, regardless of what the index says.
pub fn pair_masks(indices: &[usize], index: &PairIndex) -> (Array2<bool>, Array2<bool>) {
    let b = indices.len();
    let mut positives = Array2::from_elem((b, b), false);
    let mut negatives = Array2::from_elem((b, b), false);
    for (r, &i) in indices.iter().enumerate() {
        for (c, &j) in indices.iter().enumerate() {
            positives[[r, c]] = index.is_positive(i, j);
            negatives[[r, c]] = i != j && !index.is_nonnegative(i, j);
        }
    }
    (positives, negatives)
}
