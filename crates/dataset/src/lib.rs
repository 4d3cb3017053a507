//! Dataset provider for the feature-selection service.
//!
//! Loads the labeled flow-statistics CSV, encodes the label column, and
//! produces a reproducible train/validation/test partition.

use std::path::Path;

use ndarray::{Array1, Array2, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use thiserror::Error;
use tracing::debug;

/// Name of the label column in the source CSV.
///
/// The ISCX flow-meter export spells it this way.
pub const LABEL_COLUMN: &str = "calss";

/// Seed driving the partition shuffle.
pub const SPLIT_SEED: u64 = 42;

/// Errors raised while loading or partitioning the dataset.
#[derive(Debug, Error)]
pub enum DatasetError {
    /// The source file is missing or unreadable.
    #[error(
        "dataset file not available at {path}: {source}. \
         Place the labeled CSV there or point DATASET_PATH at it"
    )]
    Unavailable {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The source file exists but its contents cannot be used.
    #[error("dataset file at {path} is malformed: {reason}")]
    Malformed { path: String, reason: String },
}

/// One partition: feature matrix plus encoded labels, row-aligned.
#[derive(Debug, Clone, PartialEq)]
pub struct Partition {
    pub records: Array2<f64>,
    pub targets: Array1<usize>,
}

impl Partition {
    /// Returns the number of rows in this partition.
    #[must_use]
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    /// Returns true if the partition holds no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

/// A labeled dataset split into train/validation/test partitions.
#[derive(Debug, Clone, PartialEq)]
pub struct PartitionedDataset {
    /// Feature column names in original order.
    pub feature_names: Vec<String>,

    /// Distinct label values in order of first occurrence; the position of a
    /// label is its encoded class.
    pub classes: Vec<String>,

    /// Training partition (60% of rows).
    pub train: Partition,

    /// Validation partition (20% of rows).
    pub validation: Partition,

    /// Held-out partition (20% of rows), reserved for a future evaluation
    /// step. Not consumed by the current pipeline.
    pub test: Partition,
}

/// Loads the labeled CSV at `path` and partitions it 60/20/20.
///
/// The label column is factorized by order of first occurrence; every other
/// column is parsed as an `f64` feature. The split uses a fixed-seed shuffle,
/// so repeated calls against an unchanged file yield identical partitions.
///
/// # Errors
///
/// Returns [`DatasetError::Unavailable`] if the file cannot be opened and
/// [`DatasetError::Malformed`] if the label column is missing, a feature
/// fails to parse, or the file holds no data rows.
pub fn load_and_partition(path: &Path) -> Result<PartitionedDataset, DatasetError> {
    let raw = load_csv(path)?;

    debug!(
        rows = raw.targets.len(),
        features = raw.feature_names.len(),
        classes = raw.classes.len(),
        "dataset loaded"
    );

    Ok(partition(raw))
}

struct RawDataset {
    feature_names: Vec<String>,
    classes: Vec<String>,
    records: Array2<f64>,
    targets: Array1<usize>,
}

fn load_csv(path: &Path) -> Result<RawDataset, DatasetError> {
    let display_path = path.display().to_string();

    let file = std::fs::File::open(path).map_err(|source| DatasetError::Unavailable {
        path: display_path.clone(),
        source,
    })?;

    let malformed = |reason: String| DatasetError::Malformed {
        path: display_path.clone(),
        reason,
    };

    let mut reader = csv::Reader::from_reader(file);

    let headers = reader
        .headers()
        .map_err(|e| malformed(format!("unreadable header row: {e}")))?
        .clone();

    let label_index = headers
        .iter()
        .position(|name| name == LABEL_COLUMN)
        .ok_or_else(|| malformed(format!("missing label column `{LABEL_COLUMN}`")))?;

    let feature_names: Vec<String> = headers
        .iter()
        .enumerate()
        .filter(|&(i, _)| i != label_index)
        .map(|(_, name)| name.to_string())
        .collect();

    let mut classes: Vec<String> = Vec::new();
    let mut values: Vec<f64> = Vec::new();
    let mut targets: Vec<usize> = Vec::new();

    for (row, record) in reader.records().enumerate() {
        let record = record.map_err(|e| malformed(format!("unreadable row {row}: {e}")))?;

        let label = record
            .get(label_index)
            .ok_or_else(|| malformed(format!("row {row} has no label field")))?;

        // Factorize by order of first occurrence. The class count is small,
        // so a linear scan stays cheap.
        let code = match classes.iter().position(|c| c == label) {
            Some(code) => code,
            None => {
                classes.push(label.to_string());
                classes.len() - 1
            }
        };
        targets.push(code);

        for (column, field) in record.iter().enumerate() {
            if column == label_index {
                continue;
            }
            let value: f64 = field.trim().parse().map_err(|_| {
                malformed(format!(
                    "row {row}, column `{}`: `{field}` is not numeric",
                    headers.get(column).unwrap_or("?")
                ))
            })?;
            values.push(value);
        }
    }

    if targets.is_empty() {
        return Err(malformed("no data rows".to_string()));
    }

    let records = Array2::from_shape_vec((targets.len(), feature_names.len()), values)
        .map_err(|e| malformed(format!("ragged rows: {e}")))?;

    Ok(RawDataset {
        feature_names,
        classes,
        records,
        targets: Array1::from_vec(targets),
    })
}

/// Splits rows 60/20/20 with a fixed-seed shuffle.
fn partition(raw: RawDataset) -> PartitionedDataset {
    let n = raw.targets.len();
    let mut indices: Vec<usize> = (0..n).collect();

    let mut rng = StdRng::seed_from_u64(SPLIT_SEED);
    indices.shuffle(&mut rng);

    // 60% train, then the remainder halved into validation and test.
    let train_end = n * 6 / 10;
    let validation_end = train_end + (n - train_end) / 2;

    let take = |slice: &[usize]| Partition {
        records: raw.records.select(Axis(0), slice),
        targets: raw.targets.select(Axis(0), slice),
    };

    PartitionedDataset {
        train: take(&indices[..train_end]),
        validation: take(&indices[train_end..validation_end]),
        test: take(&indices[validation_end..]),
        feature_names: raw.feature_names,
        classes: raw.classes,
    }
}
