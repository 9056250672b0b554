//! Place-recognition dataset: metadata table, spatial pair index and the
//! per-sample loader.
//!
//! Directory layout, per track:
//! `root/<track>/<images_dirname>/<key>.png`,
//! `root/<track>/<masks_dirname>/<key>.png`,
//! `root/<track>/<pointclouds_dirname>/<key>.bin`.
//! The metadata table is `root/<subset>.csv`.

use std::path::Path;

use crate::batch::{collate, Batch};
use crate::cloud::{filter_points, read_cloud_bin, split_coords_feats, CloudFilter};
use crate::config::DatasetConfig;
use crate::error::{DatasetError, Result};
use crate::index::PairIndex;
use crate::modality::Modality;
use crate::sample::Sample;
use crate::table::MetadataTable;
use crate::transforms::{CloudSetTransform, CloudTransform, ImageTransform, MaskTransform};

pub struct Dataset {
    config: DatasetConfig,
    modalities: Vec<Modality>,
    table: MetadataTable,
    index: PairIndex,
    image_transform: ImageTransform,
    mask_transform: MaskTransform,
    cloud_transform: CloudTransform,
    cloud_set_transform: CloudSetTransform,
    filter: CloudFilter,
}

impl Dataset {
    /// Validate the configuration, load the metadata table and build the
    /// positive/nonnegative index.
    ///
    /// All configuration errors surface here, not during iteration: unknown
    /// modality names, missing subdirectory settings, absent directories and
    /// inconsistent thresholds.
    pub fn new(config: DatasetConfig) -> Result<Self> {
        let modalities = config
            .data_to_load
            .iter()
            .map(|name| Modality::parse(name))
            .collect::<Result<Vec<_>>>()?;

        if config.spherical_coords {
            return Err(DatasetError::NotImplemented(
                "spherical point-cloud coordinates",
            ));
        }
        if config.positive_threshold <= 0.0 || config.negative_threshold < config.positive_threshold
        {
            return Err(DatasetError::InvalidConfig(format!(
                "thresholds must satisfy 0 < positive <= negative, got {} and {}",
                config.positive_threshold, config.negative_threshold
            )));
        }
        if config.pointcloud_quantization_size <= 0.0 {
            return Err(DatasetError::InvalidConfig(format!(
                "pointcloud_quantization_size must be positive, got {}",
                config.pointcloud_quantization_size
            )));
        }
        if config.point_record_width != 3 && config.point_record_width != 4 {
            return Err(DatasetError::InvalidConfig(format!(
                "point_record_width must be 3 or 4, got {}",
                config.point_record_width
            )));
        }
        if config.use_intensity_values && config.point_record_width != 4 {
            return Err(DatasetError::InvalidConfig(
                "use_intensity_values requires point_record_width = 4".to_string(),
            ));
        }

        let csv_path = config.dataset_root.join(config.subset.csv_name());
        let table = MetadataTable::from_csv_file(&csv_path)?;
        if table.is_empty() {
            return Err(DatasetError::InvalidConfig(format!(
                "metadata table {} has no rows",
                csv_path.display()
            )));
        }

        // Directory checks against the first track, mirroring how the data
        // is laid out after preprocessing.
        let first_track = table.row(0)?.track.clone();
        let wants_images = modalities.iter().any(|m| matches!(m, Modality::Image(_)));
        let wants_masks = modalities.iter().any(|m| matches!(m, Modality::Mask(_)));
        let wants_clouds = modalities.contains(&Modality::PointCloudLidar);
        if wants_images {
            let dirname = require_dirname(config.images_dirname.as_deref(), "images_dirname")?;
            check_track_dir(&config.dataset_root, &first_track, dirname, "images directory")?;
        }
        if wants_masks {
            let dirname = require_dirname(config.masks_dirname.as_deref(), "masks_dirname")?;
            check_track_dir(&config.dataset_root, &first_track, dirname, "masks directory")?;
        }
        if wants_clouds {
            let dirname =
                require_dirname(config.pointclouds_dirname.as_deref(), "pointclouds_dirname")?;
            check_track_dir(
                &config.dataset_root,
                &first_track,
                dirname,
                "pointclouds directory",
            )?;
        }

        let index = PairIndex::build(
            &table.positions(),
            config.positive_threshold,
            config.negative_threshold,
        );
        log::info!(
            "dataset at {}: {} samples, subset {:?}, modalities {:?}",
            config.dataset_root.display(),
            table.len(),
            config.subset,
            config.data_to_load,
        );

        let train = config.subset.is_train();
        let filter = CloudFilter {
            max_distance: config.max_point_distance,
            max_coord: config.max_point_coord,
        };
        Ok(Self {
            config,
            modalities,
            table,
            index,
            image_transform: ImageTransform::new(train),
            mask_transform: MaskTransform::new(train),
            cloud_transform: CloudTransform::new(train),
            cloud_set_transform: CloudSetTransform::new(train),
            filter,
        })
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn pair_index(&self) -> &PairIndex {
        &self.index
    }

    /// Load one sample: resolve file paths from the metadata row, decode the
    /// payloads and apply the per-sample transforms.
    pub fn get(&self, idx: usize) -> Result<Sample> {
        let row = self.table.row(idx)?;
        let mut sample = Sample::new(idx, row.northing, row.easting);
        let track_dir = self.config.dataset_root.join(&row.track);

        for modality in &self.modalities {
            let key = row
                .key(modality.table_column())
                .ok_or_else(|| DatasetError::Table {
                    row: idx,
                    message: format!("missing column {:?}", modality.table_column()),
                })?;
            match modality {
                Modality::Image(cam) => {
                    let path = track_dir
                        .join(self.config.images_dirname.as_deref().unwrap_or_default())
                        .join(format!("{key}.png"));
                    let image = open_image(&path, "image")?.to_rgb8();
                    let tensor = self.image_transform.apply(&image);
                    sample
                        .data
                        .insert(format!("image_{cam}"), tensor.into_dyn());
                }
                Modality::Mask(cam) => {
                    let path = track_dir
                        .join(self.config.masks_dirname.as_deref().unwrap_or_default())
                        .join(format!("{key}.png"));
                    let mask = open_image(&path, "mask")?.to_luma8();
                    let tensor = self.mask_transform.apply(&mask);
                    sample.data.insert(format!("mask_{cam}"), tensor.into_dyn());
                }
                Modality::PointCloudLidar => {
                    let path = track_dir
                        .join(
                            self.config
                                .pointclouds_dirname
                                .as_deref()
                                .unwrap_or_default(),
                        )
                        .join(format!("{key}.bin"));
                    let points = read_cloud_bin(&path, self.config.point_record_width)?;
                    let points = filter_points(points, &self.filter);
                    let (coords, feats) =
                        split_coords_feats(&points, self.config.use_intensity_values);
                    let coords = self.cloud_transform.apply(coords);
                    sample
                        .data
                        .insert("pointcloud_lidar_coords".to_string(), coords.into_dyn());
                    sample
                        .data
                        .insert("pointcloud_lidar_feats".to_string(), feats.into_dyn());
                }
            }
        }
        Ok(sample)
    }

    /// Pack a list of retrieved samples into one training batch.
    pub fn collate_fn(&self, samples: &[Sample]) -> Result<Batch> {
        collate(
            samples,
            &self.index,
            &self.cloud_set_transform,
            self.config.pointcloud_quantization_size,
        )
    }
}

fn require_dirname<'a>(dirname: Option<&'a str>, field: &str) -> Result<&'a str> {
    dirname.ok_or_else(|| {
        DatasetError::InvalidConfig(format!("{field} must be set for the requested modalities"))
    })
}

fn check_track_dir(root: &Path, track: &str, dirname: &str, what: &'static str) -> Result<()> {
    let path = root.join(track).join(dirname);
    if !path.is_dir() {
        return Err(DatasetError::NotFound { what, path });
    }
    Ok(())
}

fn open_image(path: &Path, what: &'static str) -> Result<image::DynamicImage> {
    if !path.is_file() {
        return Err(DatasetError::NotFound {
            what,
            path: path.to_path_buf(),
        });
    }
    image::open(path).map_err(|e| DatasetError::Decode {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}
