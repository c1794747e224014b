//! Lazy, seeded generation of [`CrimeRecord`]s.
//!
//! Every record consumes the random source in the same order (crime type,
//! latitude noise, longitude noise), so a given seed and plan always yield
//! the same sequence.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use crime_bench_crime_models::{
    BERLIN_BOUNDS, CrimeRecord, District, district_for_partition, partition_label,
};
use crime_bench_generator_models::DistrictAssignment;
use rand::SeedableRng as _;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution as _, Normal};

use crate::GenerateError;
use crate::layout::split_evenly;
use crate::sampler::WeightedSampler;

/// Standard deviation, in degrees, of the noise added to district centers.
pub const COORDINATE_NOISE_DEG: f64 = 0.015;

/// Minutes between consecutive events of one partition.
const EVENT_INTERVAL_MINUTES: i64 = 1;

/// Time of the first event in every partition.
fn first_event_time() -> Option<NaiveDateTime> {
    NaiveDate::from_ymd_opt(2025, 1, 1)?.and_hms_opt(0, 0, 0)
}

/// Rounds to 6 decimal places (~0.1 m).
fn round_coordinate(value: f64) -> f64 {
    (value * 1e6).round() / 1e6
}

struct Partition {
    label: String,
    district: &'static District,
    rows: u64,
}

/// Iterator over the records of one generation run.
///
/// Ids start at 0 and increase by one per record. Within a partition event
/// times strictly increase, one minute apart.
pub struct RecordSynthesizer {
    rng: ChaCha8Rng,
    sampler: WeightedSampler,
    noise: Normal<f64>,
    partitions: Vec<Partition>,
    assignment: DistrictAssignment,
    start: NaiveDateTime,
    total_rows: u64,
    next_id: u64,
    // Position inside the current partition for blocked assignment.
    cursor: usize,
    offset: u64,
}

impl RecordSynthesizer {
    /// Creates a synthesizer producing `total_rows` records over
    /// `partitions` districts.
    ///
    /// # Errors
    ///
    /// Returns [`GenerateError::Invariant`] if `partitions` is zero.
    pub fn new(
        total_rows: u64,
        partitions: u32,
        assignment: DistrictAssignment,
        seed: u64,
        sampler: WeightedSampler,
    ) -> Result<Self, GenerateError> {
        if partitions == 0 {
            return Err(GenerateError::Invariant(
                "record synthesizer needs at least one partition".to_string(),
            ));
        }

        let noise = Normal::new(0.0, COORDINATE_NOISE_DEG)
            .map_err(|e| GenerateError::Invariant(format!("coordinate noise: {e}")))?;
        let start = first_event_time()
            .ok_or_else(|| GenerateError::Invariant("invalid start timestamp".to_string()))?;

        let count = partitions as usize;
        let partitions = split_evenly(total_rows, partitions)
            .into_iter()
            .enumerate()
            .map(|(i, rows)| Partition {
                label: partition_label(i, count),
                district: district_for_partition(i),
                rows,
            })
            .collect();

        Ok(Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            sampler,
            noise,
            partitions,
            assignment,
            start,
            total_rows,
            next_id: 0,
            cursor: 0,
            offset: 0,
        })
    }

    /// Returns the partition index and the record's position inside it.
    fn place(&mut self, id: u64) -> (usize, u64) {
        match self.assignment {
            DistrictAssignment::RoundRobin => {
                let count = self.partitions.len() as u64;
                #[allow(clippy::cast_possible_truncation)]
                let index = (id % count) as usize;
                (index, id / count)
            }
            DistrictAssignment::Blocked => {
                while self.offset >= self.partitions[self.cursor].rows {
                    self.cursor += 1;
                    self.offset = 0;
                }
                let placed = (self.cursor, self.offset);
                self.offset += 1;
                placed
            }
        }
    }
}

impl Iterator for RecordSynthesizer {
    type Item = CrimeRecord;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next_id >= self.total_rows {
            return None;
        }
        let id = self.next_id;
        self.next_id += 1;

        let (index, offset) = self.place(id);
        let primary_type = self.sampler.sample(&mut self.rng);
        let lat_noise = self.noise.sample(&mut self.rng);
        let lon_noise = self.noise.sample(&mut self.rng);

        let partition = &self.partitions[index];
        let (lat, lon) = BERLIN_BOUNDS.clamp(
            partition.district.center_lat + lat_noise,
            partition.district.center_lon + lon_noise,
        );

        #[allow(clippy::cast_possible_wrap)]
        let minutes = offset as i64 * EVENT_INTERVAL_MINUTES;

        Some(CrimeRecord {
            id,
            district: partition.label.clone(),
            datetime: self.start + Duration::minutes(minutes),
            primary_type,
            lat: round_coordinate(lat),
            lon: round_coordinate(lon),
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = usize::try_from(self.total_rows - self.next_id).unwrap_or(usize::MAX);
        (remaining, Some(remaining))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, BTreeSet};

    use crime_bench_generator_models::SamplingMode;

    use super::*;
    use crate::weights::WeightTable;

    fn synthesizer(
        total: u64,
        partitions: u32,
        assignment: DistrictAssignment,
        seed: u64,
    ) -> RecordSynthesizer {
        let sampler =
            WeightedSampler::new(&WeightTable::realistic(), SamplingMode::Weighted).unwrap();
        RecordSynthesizer::new(total, partitions, assignment, seed, sampler).unwrap()
    }

    #[test]
    fn yields_exact_row_count_with_contiguous_ids() {
        let records: Vec<_> = synthesizer(1_003, 7, DistrictAssignment::Blocked, 1).collect();
        assert_eq!(records.len(), 1_003);
        for (i, record) in records.iter().enumerate() {
            assert_eq!(record.id, i as u64);
        }
    }

    #[test]
    fn uses_exactly_the_requested_number_of_districts() {
        for assignment in [DistrictAssignment::Blocked, DistrictAssignment::RoundRobin] {
            for partitions in [1, 2, 12, 25] {
                let labels: BTreeSet<String> = synthesizer(500, partitions, assignment, 9)
                    .map(|r| r.district)
                    .collect();
                assert_eq!(labels.len(), partitions as usize, "{assignment} {partitions}");
            }
        }
    }

    #[test]
    fn timestamps_strictly_increase_within_each_district() {
        for assignment in [DistrictAssignment::Blocked, DistrictAssignment::RoundRobin] {
            let mut last: BTreeMap<String, NaiveDateTime> = BTreeMap::new();
            for record in synthesizer(600, 12, assignment, 5) {
                if let Some(prev) = last.get(&record.district) {
                    assert!(record.datetime > *prev, "{assignment}: {record:?}");
                }
                last.insert(record.district.clone(), record.datetime);
            }
        }
    }

    #[test]
    fn blocked_partitions_are_contiguous_id_ranges() {
        let records: Vec<_> = synthesizer(10, 4, DistrictAssignment::Blocked, 3).collect();
        let districts: Vec<&str> = records.iter().map(|r| r.district.as_str()).collect();
        assert_eq!(
            districts,
            [
                "Mitte",
                "Mitte",
                "Mitte",
                "Friedrichshain-Kreuzberg",
                "Friedrichshain-Kreuzberg",
                "Friedrichshain-Kreuzberg",
                "Pankow",
                "Pankow",
                "Charlottenburg-Wilmersdorf",
                "Charlottenburg-Wilmersdorf",
            ]
        );
        assert_eq!(records[3].datetime, first_event_time().unwrap());
    }

    #[test]
    fn round_robin_cycles_through_districts() {
        let records: Vec<_> = synthesizer(6, 3, DistrictAssignment::RoundRobin, 3).collect();
        assert_eq!(records[0].district, "Mitte");
        assert_eq!(records[1].district, "Friedrichshain-Kreuzberg");
        assert_eq!(records[3].district, "Mitte");
        assert_eq!(records[3].datetime, records[0].datetime + Duration::minutes(1));
    }

    #[test]
    fn coordinates_stay_inside_berlin() {
        for record in synthesizer(5_000, 12, DistrictAssignment::Blocked, 11) {
            assert!(
                BERLIN_BOUNDS.contains(record.lat, record.lon),
                "{record:?}"
            );
            assert!((record.lat * 1e6 - (record.lat * 1e6).round()).abs() < 1e-6);
        }
    }

    #[test]
    fn same_seed_reproduces_the_sequence() {
        let a: Vec<_> = synthesizer(300, 3, DistrictAssignment::Blocked, 42).collect();
        let b: Vec<_> = synthesizer(300, 3, DistrictAssignment::Blocked, 42).collect();
        let c: Vec<_> = synthesizer(300, 3, DistrictAssignment::Blocked, 43).collect();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn size_hint_tracks_remaining_rows() {
        let mut synth = synthesizer(5, 1, DistrictAssignment::Blocked, 0);
        assert_eq!(synth.size_hint(), (5, Some(5)));
        synth.next();
        assert_eq!(synth.size_hint(), (4, Some(4)));
    }

    #[test]
    fn zero_partitions_is_an_invariant_violation() {
        let sampler =
            WeightedSampler::new(&WeightTable::realistic(), SamplingMode::Weighted).unwrap();
        assert!(matches!(
            RecordSynthesizer::new(10, 0, DistrictAssignment::Blocked, 0, sampler),
            Err(GenerateError::Invariant(_))
        ));
    }
}
