//! Reads a generated dataset back and summarizes it.
//!
//! Used to check that a custom weight table produced the intended crime
//! type mix and that ids and districts look right.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::Path;

use crime_bench_crime_models::{CrimeRecord, CrimeType};

use crate::GenerateError;

/// Summary of one dataset file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetReport {
    /// Number of data rows.
    pub rows: u64,
    /// Distinct district labels.
    pub districts: BTreeSet<String>,
    /// Row count per crime type.
    pub type_counts: BTreeMap<CrimeType, u64>,
    /// Id of the first row, if any.
    pub first_id: Option<u64>,
    /// Whether every id is its predecessor plus one.
    pub sequential_ids: bool,
}

impl DatasetReport {
    /// Share of rows with `crime_type`, in [0, 1].
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn share(&self, crime_type: CrimeType) -> f64 {
        if self.rows == 0 {
            return 0.0;
        }
        self.type_counts.get(&crime_type).copied().unwrap_or(0) as f64 / self.rows as f64
    }

    /// Crime types ordered by descending frequency.
    #[must_use]
    pub fn by_frequency(&self) -> Vec<(CrimeType, u64)> {
        let mut counts: Vec<_> = self.type_counts.iter().map(|(t, c)| (*t, *c)).collect();
        counts.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        counts
    }
}

impl fmt::Display for DatasetReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total rows: {}", self.rows)?;
        writeln!(f, "Districts: {}", self.districts.len())?;
        writeln!(
            f,
            "Ids: {}",
            if self.sequential_ids { "sequential" } else { "NOT sequential" }
        )?;
        writeln!(f)?;
        writeln!(f, "Crime type distribution:")?;
        for (crime_type, count) in self.by_frequency() {
            writeln!(
                f,
                "  {:<16} {:>10} {:>7.2}%",
                crime_type.as_ref(),
                count,
                self.share(crime_type) * 100.0
            )?;
        }
        Ok(())
    }
}

/// Reads `path` and builds a [`DatasetReport`].
///
/// # Errors
///
/// * [`GenerateError::Io`] if the file cannot be opened
/// * [`GenerateError::Csv`] if a row does not match the dataset schema
pub fn inspect(path: &Path) -> Result<DatasetReport, GenerateError> {
    let file = std::fs::File::open(path).map_err(|source| GenerateError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut reader = csv::Reader::from_reader(std::io::BufReader::new(file));

    let mut report = DatasetReport {
        rows: 0,
        districts: BTreeSet::new(),
        type_counts: BTreeMap::new(),
        first_id: None,
        sequential_ids: true,
    };
    let mut last_id: Option<u64> = None;

    for row in reader.deserialize::<CrimeRecord>() {
        let record = row.map_err(|source| GenerateError::Csv {
            path: path.to_path_buf(),
            source,
        })?;

        report.rows += 1;
        report.first_id.get_or_insert(record.id);
        if last_id.is_some_and(|prev| record.id != prev + 1) {
            report.sequential_ids = false;
        }
        last_id = Some(record.id);

        *report.type_counts.entry(record.primary_type).or_default() += 1;
        report.districts.insert(record.district);
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_types_districts_and_id_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("crime_data.csv");
        std::fs::write(
            &path,
            "id,district,datetime,primary_type,lat,lon\n\
             0,Mitte,2025-01-01 00:00:00,THEFT,52.5,13.4\n\
             1,Mitte,2025-01-01 00:01:00,THEFT,52.5,13.4\n\
             2,Pankow,2025-01-01 00:00:00,CRIMINAL DAMAGE,52.5,13.4\n\
             3,Pankow,2025-01-01 00:01:00,HOMICIDE,52.5,13.4\n",
        )
        .unwrap();

        let report = inspect(&path).unwrap();

        assert_eq!(report.rows, 4);
        assert_eq!(report.districts.len(), 2);
        assert_eq!(report.first_id, Some(0));
        assert!(report.sequential_ids);
        assert!((report.share(CrimeType::Theft) - 0.5).abs() < f64::EPSILON);
        assert_eq!(report.by_frequency()[0], (CrimeType::Theft, 2));
    }

    #[test]
    fn detects_gaps_in_ids() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gap.csv");
        std::fs::write(
            &path,
            "id,district,datetime,primary_type,lat,lon\n\
             0,Mitte,2025-01-01 00:00:00,THEFT,52.5,13.4\n\
             5,Mitte,2025-01-01 00:01:00,THEFT,52.5,13.4\n",
        )
        .unwrap();

        assert!(!inspect(&path).unwrap().sequential_ids);
    }

    #[test]
    fn unknown_crime_type_is_a_csv_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        std::fs::write(
            &path,
            "id,district,datetime,primary_type,lat,lon\n\
             0,Mitte,2025-01-01 00:00:00,ARSON,52.5,13.4\n",
        )
        .unwrap();

        assert!(matches!(inspect(&path), Err(GenerateError::Csv { .. })));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            inspect(&dir.path().join("absent.csv")),
            Err(GenerateError::Io { .. })
        ));
    }
}
