//! On-disk dataset readers for place-recognition training.
//!
//! A dataset root holds one subdirectory per track (recording session) plus a
//! per-subset metadata CSV; each metadata row is one sample with a UTM
//! position and per-modality payload keys. [`dataset::Dataset::get`] loads
//! one sample, [`batch::collate`] packs a list of samples into batch tensors
//! together with the positive/negative pair masks derived from the spatial
//! [`index::PairIndex`].

pub mod batch;
pub mod cloud;
pub mod config;
pub mod dataset;
pub mod error;
pub mod index;
pub mod modality;
pub mod sample;
pub mod table;
pub mod transforms;

pub use batch::{collate, Batch, BatchTensor};
pub use config::{DatasetConfig, Subset};
pub use dataset::Dataset;
pub use error::{DatasetError, Result};
pub use index::PairIndex;
pub use sample::Sample;
