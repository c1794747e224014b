#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Crime record types, category taxonomy and district geography for the
//! synthetic benchmark dataset.
//!
//! Every generated row is a [`CrimeRecord`]. Its `primary_type` comes from
//! the fixed [`CrimeType`] set and its `district` label is derived from one
//! of the twelve Berlin [`District`]s.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Timestamp format used for the `datetime` column of generated files.
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Column order of every generated CSV file.
pub const CSV_COLUMNS: [&str; 6] = ["id", "district", "datetime", "primary_type", "lat", "lon"];

/// Primary crime category of a synthetic record.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
pub enum CrimeType {
    /// Unlawful taking of property
    #[serde(rename = "THEFT")]
    #[strum(serialize = "THEFT")]
    Theft,
    /// Offensive physical contact
    #[serde(rename = "BATTERY")]
    #[strum(serialize = "BATTERY")]
    Battery,
    /// Willful damage to property
    #[serde(rename = "CRIMINAL DAMAGE")]
    #[strum(serialize = "CRIMINAL DAMAGE")]
    CriminalDamage,
    /// Threat or attempt of bodily harm
    #[serde(rename = "ASSAULT")]
    #[strum(serialize = "ASSAULT")]
    Assault,
    /// Taking property by force or threat
    #[serde(rename = "ROBBERY")]
    #[strum(serialize = "ROBBERY")]
    Robbery,
    /// Drug offenses
    #[serde(rename = "NARCOTICS")]
    #[strum(serialize = "NARCOTICS")]
    Narcotics,
    /// Unlawful killing
    #[serde(rename = "HOMICIDE")]
    #[strum(serialize = "HOMICIDE")]
    Homicide,
}

impl CrimeType {
    /// Returns all variants of this enum, in canonical column order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Theft,
            Self::Battery,
            Self::CriminalDamage,
            Self::Assault,
            Self::Robbery,
            Self::Narcotics,
            Self::Homicide,
        ]
    }

    /// Position of this type within [`CrimeType::all()`].
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Relative frequency of this type in the built-in "realistic"
    /// distribution. The values over [`CrimeType::all()`] sum to 1.
    #[must_use]
    pub const fn realistic_weight(self) -> f64 {
        match self {
            Self::Theft => 0.35,
            Self::Battery => 0.20,
            Self::CriminalDamage => 0.15,
            Self::Assault | Self::Robbery => 0.10,
            Self::Narcotics => 0.09,
            Self::Homicide => 0.01,
        }
    }

    /// Parses a user-supplied label, ignoring case and surrounding
    /// whitespace (e.g. `" criminal damage "`).
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        label.trim().to_uppercase().parse().ok()
    }
}

/// A Berlin district used as the geographic anchor of a partition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct District {
    /// Official district name.
    pub name: &'static str,
    /// Latitude of the district center.
    pub center_lat: f64,
    /// Longitude of the district center.
    pub center_lon: f64,
}

/// The twelve Berlin districts, in the order partitions are assigned.
pub const BERLIN_DISTRICTS: [District; 12] = [
    District { name: "Mitte", center_lat: 52.5177, center_lon: 13.4024 },
    District { name: "Friedrichshain-Kreuzberg", center_lat: 52.5015, center_lon: 13.4338 },
    District { name: "Pankow", center_lat: 52.5701, center_lon: 13.4079 },
    District { name: "Charlottenburg-Wilmersdorf", center_lat: 52.5028, center_lon: 13.2809 },
    District { name: "Spandau", center_lat: 52.5332, center_lon: 13.1664 },
    District { name: "Steglitz-Zehlendorf", center_lat: 52.4343, center_lon: 13.2625 },
    District { name: "Tempelhof-Schöneberg", center_lat: 52.4630, center_lon: 13.3768 },
    District { name: "Neukölln", center_lat: 52.4571, center_lon: 13.4533 },
    District { name: "Treptow-Köpenick", center_lat: 52.4504, center_lon: 13.5786 },
    District { name: "Marzahn-Hellersdorf", center_lat: 52.5401, center_lon: 13.5750 },
    District { name: "Lichtenberg", center_lat: 52.5140, center_lon: 13.4930 },
    District { name: "Reinickendorf", center_lat: 52.6053, center_lon: 13.2982 },
];

/// Geographic extent every generated coordinate is clamped into.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    /// Southern edge.
    pub min_lat: f64,
    /// Northern edge.
    pub max_lat: f64,
    /// Western edge.
    pub min_lon: f64,
    /// Eastern edge.
    pub max_lon: f64,
}

impl BoundingBox {
    /// Returns `true` if the point lies inside the box (edges inclusive).
    #[must_use]
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        (self.min_lat..=self.max_lat).contains(&lat) && (self.min_lon..=self.max_lon).contains(&lon)
    }

    /// Clamps a point onto the box.
    #[must_use]
    pub fn clamp(&self, lat: f64, lon: f64) -> (f64, f64) {
        (
            lat.clamp(self.min_lat, self.max_lat),
            lon.clamp(self.min_lon, self.max_lon),
        )
    }
}

/// Approximate extent of the city of Berlin.
pub const BERLIN_BOUNDS: BoundingBox = BoundingBox {
    min_lat: 52.33,
    max_lat: 52.68,
    min_lon: 13.08,
    max_lon: 13.77,
};

/// Returns the district anchoring partition `index` (0-based).
///
/// Districts repeat once `index` exceeds the twelve available.
#[must_use]
pub const fn district_for_partition(index: usize) -> &'static District {
    &BERLIN_DISTRICTS[index % BERLIN_DISTRICTS.len()]
}

/// Returns the label written to the `district` column for partition
/// `index` when `partitions` partitions are generated.
///
/// With more partitions than districts every label gets a 1-based
/// partition suffix (`Mitte_1`, ..., `Mitte_13`) so all labels stay
/// distinct.
#[must_use]
pub fn partition_label(index: usize, partitions: usize) -> String {
    let district = district_for_partition(index);
    if partitions > BERLIN_DISTRICTS.len() {
        format!("{}_{}", district.name, index + 1)
    } else {
        district.name.to_string()
    }
}

/// One synthetic crime event, serialized as one CSV row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrimeRecord {
    /// Sequential identifier, unique within a generation run.
    pub id: u64,
    /// Partition label (see [`partition_label`]).
    pub district: String,
    /// Event time.
    #[serde(with = "datetime_format")]
    pub datetime: NaiveDateTime,
    /// Crime category.
    pub primary_type: CrimeType,
    /// Latitude, rounded to 6 decimals.
    pub lat: f64,
    /// Longitude, rounded to 6 decimals.
    pub lon: f64,
}

mod datetime_format {
    use chrono::NaiveDateTime;
    use serde::{Deserialize as _, Deserializer, Serializer};

    use super::DATETIME_FORMAT;

    pub fn serialize<S: Serializer>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&value.format(DATETIME_FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&raw, DATETIME_FORMAT).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn realistic_weights_sum_to_one() {
        let total: f64 = CrimeType::all().iter().map(|t| t.realistic_weight()).sum();
        assert!((total - 1.0).abs() < 1e-12, "sum was {total}");
    }

    #[test]
    fn index_matches_position_in_all() {
        for (i, t) in CrimeType::all().iter().enumerate() {
            assert_eq!(t.index(), i);
        }
    }

    #[test]
    fn labels_use_upper_case_with_spaces() {
        assert_eq!(CrimeType::CriminalDamage.to_string(), "CRIMINAL DAMAGE");
        assert_eq!(CrimeType::from_label(" criminal damage "), Some(CrimeType::CriminalDamage));
        assert_eq!(CrimeType::from_label("Theft"), Some(CrimeType::Theft));
        assert_eq!(CrimeType::from_label("ARSON"), None);
    }

    #[test]
    fn partition_labels_are_distinct_beyond_twelve() {
        let labels: std::collections::BTreeSet<String> =
            (0..30).map(|i| partition_label(i, 30)).collect();
        assert_eq!(labels.len(), 30);
        assert_eq!(partition_label(12, 30), "Mitte_13");
        assert_eq!(partition_label(0, 12), "Mitte");
    }

    #[test]
    fn district_centers_lie_inside_bounds() {
        for d in &BERLIN_DISTRICTS {
            assert!(BERLIN_BOUNDS.contains(d.center_lat, d.center_lon), "{}", d.name);
        }
    }

    #[test]
    fn clamp_pulls_outside_points_onto_edges() {
        let (lat, lon) = BERLIN_BOUNDS.clamp(60.0, 0.0);
        assert!((lat - BERLIN_BOUNDS.max_lat).abs() < f64::EPSILON);
        assert!((lon - BERLIN_BOUNDS.min_lon).abs() < f64::EPSILON);
    }
}
