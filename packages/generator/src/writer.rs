//! Streams records into CSV shards.
//!
//! Rows go straight from the record iterator through a buffered `csv`
//! writer, so memory use does not grow with the dataset size.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::sync::Arc;

use crime_bench_crime_models::{CSV_COLUMNS, CrimeRecord};
use crime_bench_generator_models::ShardSummary;
use crime_bench_progress::ProgressCallback;

use crate::GenerateError;
use crate::layout::shard_file_name;

/// Rows between progress updates.
const PROGRESS_INTERVAL: u64 = 10_000;

/// Output buffer size per shard.
const WRITE_BUFFER_BYTES: usize = 1 << 20;

/// Writes `records` into `dir`, one file per entry of `shard_rows`.
///
/// Shard `i` receives the next `shard_rows[i]` records. Every file starts
/// with the header row, even if its shard is empty. `dir` is created if
/// missing. Files already written are left in place if a later shard fails.
///
/// # Errors
///
/// * [`GenerateError::Io`] if the directory or a file cannot be created or
///   flushed
/// * [`GenerateError::Csv`] if a row cannot be written
/// * [`GenerateError::Invariant`] if `records` runs out before every shard
///   is full
pub fn write_shards<I>(
    dir: &Path,
    records: I,
    shard_rows: &[u64],
    progress: &Arc<dyn ProgressCallback>,
) -> Result<Vec<ShardSummary>, GenerateError>
where
    I: IntoIterator<Item = CrimeRecord>,
{
    std::fs::create_dir_all(dir).map_err(|source| GenerateError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let count = u32::try_from(shard_rows.len())
        .map_err(|_| GenerateError::Invariant("too many shards".to_string()))?;
    let mut records = records.into_iter();
    let mut summaries = Vec::with_capacity(shard_rows.len());
    let mut next_id = 0;

    for (index, &rows) in (0..count).zip(shard_rows) {
        let path = dir.join(shard_file_name(index, count));
        log::debug!("Writing {rows} rows to {}", path.display());

        let file = File::create(&path).map_err(|source| GenerateError::Io {
            path: path.clone(),
            source,
        })?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(BufWriter::with_capacity(WRITE_BUFFER_BYTES, file));

        let csv_error = |source| GenerateError::Csv {
            path: path.clone(),
            source,
        };

        writer.write_record(CSV_COLUMNS).map_err(csv_error)?;

        let mut first_id = None;
        let mut pending = 0;
        for _ in 0..rows {
            let record = records.next().ok_or_else(|| {
                GenerateError::Invariant(format!(
                    "record stream ended early while writing {}",
                    path.display()
                ))
            })?;
            first_id.get_or_insert(record.id);
            writer.serialize(&record).map_err(csv_error)?;

            pending += 1;
            if pending == PROGRESS_INTERVAL {
                progress.inc(pending);
                pending = 0;
            }
        }
        progress.inc(pending);

        writer.flush().map_err(|source| GenerateError::Io {
            path: path.clone(),
            source,
        })?;

        summaries.push(ShardSummary {
            path,
            first_id: first_id.unwrap_or(next_id),
            rows,
        });
        next_id += rows;
    }

    Ok(summaries)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use crime_bench_crime_models::CrimeType;
    use crime_bench_progress::CountingProgress;

    use super::*;

    fn record(id: u64) -> CrimeRecord {
        CrimeRecord {
            id,
            district: "Neukölln".to_string(),
            datetime: NaiveDate::from_ymd_opt(2025, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            primary_type: CrimeType::CriminalDamage,
            lat: 52.457_1,
            lon: 13.453_3,
        }
    }

    #[test]
    fn writes_header_and_rows_in_column_order() {
        let dir = tempfile::tempdir().unwrap();
        let progress: Arc<dyn ProgressCallback> = Arc::new(CountingProgress::default());

        let shards = write_shards(dir.path(), (0..2).map(record), &[2], &progress).unwrap();

        assert_eq!(shards.len(), 1);
        assert_eq!(shards[0].path, dir.path().join("crime_data.csv"));
        let content = std::fs::read_to_string(&shards[0].path).unwrap();
        assert_eq!(
            content,
            "id,district,datetime,primary_type,lat,lon\n\
             0,Neukölln,2025-01-01 00:00:00,CRIMINAL DAMAGE,52.4571,13.4533\n\
             1,Neukölln,2025-01-01 00:00:00,CRIMINAL DAMAGE,52.4571,13.4533\n"
        );
    }

    #[test]
    fn splits_rows_across_numbered_shards() {
        let dir = tempfile::tempdir().unwrap();
        let counting = Arc::new(CountingProgress::default());
        let progress: Arc<dyn ProgressCallback> = counting.clone();

        let shards = write_shards(dir.path(), (0..5).map(record), &[2, 2, 1], &progress).unwrap();

        let names: Vec<_> = shards
            .iter()
            .map(|s| s.path.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["crime_data_0.csv", "crime_data_1.csv", "crime_data_2.csv"]);
        assert_eq!(
            shards.iter().map(|s| s.first_id).collect::<Vec<_>>(),
            [0, 2, 4]
        );
        assert_eq!(counting.position(), 5);

        let last = std::fs::read_to_string(&shards[2].path).unwrap();
        assert_eq!(last.lines().count(), 2);
        assert!(last.lines().nth(1).unwrap().starts_with("4,"));
    }

    #[test]
    fn creates_missing_directories() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("large").join("scale_2");
        let progress = crime_bench_progress::null_progress();

        write_shards(&nested, (0..1).map(record), &[1], &progress).unwrap();

        assert!(nested.join("crime_data.csv").is_file());
    }

    #[test]
    fn short_record_stream_is_an_invariant_violation() {
        let dir = tempfile::tempdir().unwrap();
        let progress = crime_bench_progress::null_progress();

        let result = write_shards(dir.path(), (0..1).map(record), &[3], &progress);

        assert!(matches!(result, Err(GenerateError::Invariant(_))));
    }

    #[test]
    fn unwritable_directory_reports_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not_a_dir");
        std::fs::write(&blocker, b"").unwrap();
        let progress = crime_bench_progress::null_progress();

        let err = write_shards(&blocker.join("tiny"), (0..1).map(record), &[1], &progress)
            .unwrap_err();

        match err {
            GenerateError::Io { path, .. } => assert_eq!(path, blocker.join("tiny")),
            other => panic!("expected I/O error, got {other:?}"),
        }
    }
}
