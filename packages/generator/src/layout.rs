//! Output path convention and shard sizing.
//!
//! ```text
//! <root>/tiny/crime_data.csv
//! <root>/large/scale_<N>/crime_data.csv
//! <root>/large/scale_<N>/crime_data_<i>.csv   (when split into shards)
//! ```

use std::path::{Path, PathBuf};

use crime_bench_generator_models::{DATASET_FILE_STEM, SizeClass};

/// Directory a dataset of `size_class` at `scale` is written to.
#[must_use]
pub fn dataset_dir(root: &Path, size_class: SizeClass, scale: u32) -> PathBuf {
    match size_class {
        SizeClass::Tiny => root.join("tiny"),
        SizeClass::Large => root.join("large").join(format!("scale_{scale}")),
    }
}

/// File name of shard `index` out of `count`.
#[must_use]
pub fn shard_file_name(index: u32, count: u32) -> String {
    if count > 1 {
        format!("{DATASET_FILE_STEM}_{index}.csv")
    } else {
        format!("{DATASET_FILE_STEM}.csv")
    }
}

/// Splits `total` rows into `count` near-equal parts.
///
/// The first `total % count` parts receive one extra row, so sizes differ
/// by at most one and always sum to `total`. Used for both shards and
/// district partitions.
#[must_use]
pub fn split_evenly(total: u64, count: u32) -> Vec<u64> {
    if count == 0 {
        return Vec::new();
    }
    let count = u64::from(count);
    let base = total / count;
    let extra = total % count;
    (0..count).map(|i| base + u64::from(i < extra)).collect()
}
