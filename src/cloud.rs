//! Point-cloud reading, filtering and voxel quantization.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use ndarray::{Array2, Axis};

use crate::error::{DatasetError, Result};

/// Optional range filters applied right after decoding.
#[derive(Debug, Clone, Copy, Default)]
pub struct CloudFilter {
    /// Drop points whose xyz Euclidean norm exceeds this bound.
    pub max_distance: Option<f32>,
    /// Drop points with any of x, y, z outside `[-bound, bound]`.
    pub max_coord: Option<f32>,
}

/// Read a `.bin` point cloud: flat little-endian f32, `width` values per
/// point (3 for xyz, 4 for xyz + intensity).
pub fn read_cloud_bin(path: &Path, width: usize) -> Result<Array2<f32>> {
    let bytes = fs::read(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => DatasetError::NotFound {
            what: "point cloud",
            path: path.to_path_buf(),
        },
        _ => DatasetError::Io(e),
    })?;
    if bytes.len() % 4 != 0 {
        return Err(DatasetError::Decode {
            path: path.to_path_buf(),
            message: format!("file size {} is not a multiple of 4", bytes.len()),
        });
    }
    let values: Vec<f32> = bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect();
    if values.len() % width != 0 {
        return Err(DatasetError::Decode {
            path: path.to_path_buf(),
            message: format!(
                "{} floats do not divide into points of width {width}",
                values.len()
            ),
        });
    }
    let n = values.len() / width;
    Array2::from_shape_vec((n, width), values).map_err(|e| DatasetError::Decode {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Apply the configured range filters, keeping row order.
pub fn filter_points(points: Array2<f32>, filter: &CloudFilter) -> Array2<f32> {
    if filter.max_distance.is_none() && filter.max_coord.is_none() {
        return points;
    }
    let keep: Vec<usize> = points
        .axis_iter(Axis(0))
        .enumerate()
        .filter(|(_, row)| {
            let (x, y, z) = (row[0], row[1], row[2]);
            if let Some(bound) = filter.max_distance {
                if (x * x + y * y + z * z).sqrt() >= bound {
                    return false;
                }
            }
            if let Some(bound) = filter.max_coord {
                if [x, y, z].iter().any(|c| c.abs() > bound) {
                    return false;
                }
            }
            true
        })
        .map(|(i, _)| i)
        .collect();
    points.select(Axis(0), &keep)
}

/// Split decoded points into an `(N, 3)` coordinate tensor and an `(N, 1)`
/// feature tensor: the recorded intensity column when requested, constant
/// 1.0 otherwise.
///
/// Panics if `use_intensity` is set on points narrower than 4 columns;
/// dataset construction rejects that combination up front.
pub fn split_coords_feats(points: &Array2<f32>, use_intensity: bool) -> (Array2<f32>, Array2<f32>) {
    let n = points.nrows();
    let coords = points.slice(ndarray::s![.., ..3]).to_owned();
    let feats = if use_intensity {
        points.slice(ndarray::s![.., 3..4]).to_owned()
    } else {
        Array2::ones((n, 1))
    };
    (coords, feats)
}

/// Quantize coordinates onto a voxel grid of the given cell size.
///
/// Each point maps to the voxel `floor(coord / cell_size)` per axis. The
/// first point (input row order) landing in a voxel is kept, together with
/// its feature row; later points in the same voxel are dropped. Output rows
/// are in first-occurrence order, so the result is deterministic.
pub fn sparse_quantize(
    coords: &Array2<f32>,
    feats: &Array2<f32>,
    cell_size: f32,
) -> Result<(Array2<i32>, Array2<f32>)> {
    debug_assert!(cell_size > 0.0);
    if coords.nrows() != feats.nrows() {
        return Err(DatasetError::ShapeMismatch {
            key: "pointcloud_lidar_feats".to_string(),
            expected: vec![coords.nrows(), feats.ncols()],
            got: vec![feats.nrows(), feats.ncols()],
        });
    }
    let mut seen = HashSet::with_capacity(coords.nrows());
    let mut kept_voxels: Vec<[i32; 3]> = Vec::new();
    let mut kept_rows: Vec<usize> = Vec::new();
    for (i, row) in coords.axis_iter(Axis(0)).enumerate() {
        let voxel = [
            (row[0] / cell_size).floor() as i32,
            (row[1] / cell_size).floor() as i32,
            (row[2] / cell_size).floor() as i32,
        ];
        if seen.insert(voxel) {
            kept_voxels.push(voxel);
            kept_rows.push(i);
        }
    }
    let mut out_coords = Array2::zeros((kept_voxels.len(), 3));
    for (r, voxel) in kept_voxels.iter().enumerate() {
        for c in 0..3 {
            out_coords[[r, c]] = voxel[c];
        }
    }
    let out_feats = feats.select(Axis(0), &kept_rows);
    Ok((out_coords, out_feats))
}

/// Concatenate per-sample quantized coordinates into one `(M, 4)` tensor,
/// prefixing each sample's rows with its batch-position index.
pub fn batched_coordinates(coords_list: &[Array2<i32>]) -> Array2<i32> {
    let total: usize = coords_list.iter().map(Array2::nrows).sum();
    let mut out = Array2::zeros((total, 4));
    let mut offset = 0;
    for (batch_idx, coords) in coords_list.iter().enumerate() {
        for row in coords.axis_iter(Axis(0)) {
            out[[offset, 0]] = batch_idx as i32;
            out[[offset, 1]] = row[0];
            out[[offset, 2]] = row[1];
            out[[offset, 3]] = row[2];
            offset += 1;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn write_bin(name: &str, values: &[f32]) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("opr-dataset-{}-{name}", std::process::id()));
        let bytes: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        fs::write(&path, bytes).unwrap();
        path
    }

    #[test]
    fn read_bin_width_3_and_4() {
        let path = write_bin("w3.bin", &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let points = read_cloud_bin(&path, 3).unwrap();
        assert_eq!(points.shape(), &[2, 3]);
        assert_eq!(points[[1, 2]], 6.0);

        let points = read_cloud_bin(&path, 4).unwrap_err();
        assert!(matches!(points, DatasetError::Decode { .. }));

        let path = write_bin("w4.bin", &[1.0, 2.0, 3.0, 0.5, 4.0, 5.0, 6.0, 0.7]);
        let points = read_cloud_bin(&path, 4).unwrap();
        assert_eq!(points.shape(), &[2, 4]);
        assert_eq!(points[[0, 3]], 0.5);
    }

    #[test]
    fn read_bin_missing_file() {
        let err = read_cloud_bin(Path::new("/nonexistent/cloud.bin"), 4).unwrap_err();
        assert!(matches!(err, DatasetError::NotFound { .. }));
    }

    #[test]
    fn norm_filter() {
        let points = array![[1.0, 0.0, 0.0], [50.0, 0.0, 0.0], [0.0, 3.0, 4.0]];
        let filter = CloudFilter {
            max_distance: Some(10.0),
            max_coord: None,
        };
        let kept = filter_points(points, &filter);
        assert_eq!(kept.shape(), &[2, 3]);
        assert_eq!(kept[[1, 2]], 4.0);
    }

    #[test]
    fn axis_filter() {
        let points = array![[1.0, 2.0, 3.0], [1.0, 200.0, 3.0], [-99.0, 0.0, 0.0]];
        let filter = CloudFilter {
            max_distance: None,
            max_coord: Some(100.0),
        };
        let kept = filter_points(points, &filter);
        assert_eq!(kept.shape(), &[2, 3]);
    }

    #[test]
    fn split_constant_and_intensity_features() {
        let points = array![[1.0, 2.0, 3.0, 0.5], [4.0, 5.0, 6.0, 0.7]];
        let (coords, feats) = split_coords_feats(&points, false);
        assert_eq!(coords.shape(), &[2, 3]);
        assert_eq!(feats, array![[1.0], [1.0]]);

        let (_, feats) = split_coords_feats(&points, true);
        assert_eq!(feats, array![[0.5], [0.7]]);
    }

    #[test]
    fn quantize_dedups_same_voxel() {
        // Two points in the same 0.5 m cell, one in a different cell.
        let coords = array![[0.1, 0.1, 0.1], [0.2, 0.2, 0.2], [0.9, 0.1, 0.1]];
        let feats = array![[10.0], [20.0], [30.0]];
        let (q, f) = sparse_quantize(&coords, &feats, 0.5).unwrap();
        assert_eq!(q, array![[0, 0, 0], [1, 0, 0]]);
        // First point in the shared voxel wins.
        assert_eq!(f, array![[10.0], [30.0]]);
    }

    #[test]
    fn quantize_is_deterministic() {
        let coords = array![
            [0.13, -0.42, 2.71],
            [0.12, -0.40, 2.70],
            [-5.0, 3.3, 1.1],
            [7.7, -2.2, 0.0]
        ];
        let feats = array![[1.0], [2.0], [3.0], [4.0]];
        let (q1, f1) = sparse_quantize(&coords, &feats, 0.25).unwrap();
        let (q2, f2) = sparse_quantize(&coords, &feats, 0.25).unwrap();
        assert_eq!(q1, q2);
        assert_eq!(f1, f2);
    }

    #[test]
    fn quantize_handles_negative_coords() {
        let coords = array![[-0.1, -0.1, -0.1]];
        let feats = array![[1.0]];
        let (q, _) = sparse_quantize(&coords, &feats, 0.5).unwrap();
        // floor(-0.1 / 0.5) = -1, not 0
        assert_eq!(q, array![[-1, -1, -1]]);
    }

    #[test]
    fn batched_coordinates_prefixes_batch_index() {
        let a = array![[1, 2, 3], [4, 5, 6]];
        let b = array![[7, 8, 9]];
        let batched = batched_coordinates(&[a, b]);
        assert_eq!(batched, array![[0, 1, 2, 3], [0, 4, 5, 6], [1, 7, 8, 9]]);
    }
}
