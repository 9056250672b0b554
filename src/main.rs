use std::path::PathBuf;

use anyhow::Context;

use opr_dataset::{BatchTensor, Dataset, DatasetConfig};

fn main() -> anyhow::Result<()> {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .init();

    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .context("usage: opr-dataset <config.json>")?;
    let config = DatasetConfig::from_json_file(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;
    log::info!("config: {config:?}");

    let dataset = Dataset::new(config)?;
    log::info!("{} samples", dataset.len());

    const BATCH_SIZE: usize = 4;
    let count = dataset.len().min(BATCH_SIZE);
    let samples = (0..count)
        .map(|idx| dataset.get(idx))
        .collect::<Result<Vec<_>, _>>()?;
    let batch = dataset.collate_fn(&samples)?;

    for (name, tensor) in &batch.tensors {
        let shape = match tensor {
            BatchTensor::F32(t) => t.shape().to_vec(),
            BatchTensor::F64(t) => t.shape().to_vec(),
            BatchTensor::I32(t) => t.shape().to_vec(),
        };
        log::info!("{name}: {shape:?}");
    }
    let positives = batch.positives_mask.iter().filter(|v| **v).count();
    let negatives = batch.negatives_mask.iter().filter(|v| **v).count();
    log::info!("batch of {count}: {positives} positive pairs, {negatives} negative pairs");
    Ok(())
}
