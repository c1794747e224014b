//! Crime type weight tables.
//!
//! A [`WeightTable`] assigns every [`CrimeType`] a probability. Tables are
//! the built-in realistic distribution, a flat uniform one, or the
//! realistic one with a user override merged in via [`merge_custom`]: the
//! custom weights are kept exactly and the remaining probability mass is
//! spread over the unspecified types in proportion to their realistic
//! weights.

use std::collections::BTreeMap;
use std::fmt;

use crime_bench_crime_models::CrimeType;

/// Largest deviation from 1.0 a weight total may have.
pub const SUM_TOLERANCE: f64 = 1e-9;

/// Errors building or merging weight tables.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WeightError {
    /// An entry was not of the form `LABEL:WEIGHT`.
    #[error("invalid weight entry `{entry}`: expected LABEL:WEIGHT")]
    Malformed {
        /// The offending entry.
        entry: String,
    },

    /// The label does not name a known crime type.
    #[error("unknown crime type `{label}`")]
    UnknownType {
        /// The offending label.
        label: String,
    },

    /// The weight is not a number.
    #[error("weight for {crime_type} is not a number: `{value}`")]
    InvalidNumber {
        /// Type the weight was given for.
        crime_type: CrimeType,
        /// The raw value.
        value: String,
    },

    /// A custom weight lies outside [0, 1].
    #[error("weight for {crime_type} must be between 0 and 1, got {weight}")]
    OutOfRange {
        /// Type the weight was given for.
        crime_type: CrimeType,
        /// The offending weight.
        weight: f64,
    },

    /// The same type was given twice.
    #[error("crime type {crime_type} specified more than once")]
    Duplicate {
        /// The repeated type.
        crime_type: CrimeType,
    },

    /// Custom weights add up to more than 1.
    #[error("custom weights sum to {total:.6}, which exceeds 1")]
    SumExceedsOne {
        /// Sum of the custom weights.
        total: f64,
    },

    /// Every type was given but the weights do not add up to 1, so there is
    /// no unspecified type left to absorb the difference.
    #[error("all crime types specified but weights sum to {total:.6} instead of 1")]
    NoRemainder {
        /// Sum of the custom weights.
        total: f64,
    },

    /// The table has no entries.
    #[error("weight table is empty")]
    Empty,

    /// A table weight is negative or not finite.
    #[error("weight for {crime_type} must be a finite non-negative number, got {weight}")]
    Negative {
        /// Type the weight belongs to.
        crime_type: CrimeType,
        /// The offending weight.
        weight: f64,
    },

    /// Every weight is zero.
    #[error("weight table has no positive weight")]
    AllZero,

    /// A table that must be a probability distribution does not sum to 1.
    #[error("weight table sums to {total:.12} instead of 1")]
    NotNormalized {
        /// Actual sum.
        total: f64,
    },
}

/// Probability per crime type.
///
/// Entries are kept in [`CrimeType::all()`] order so sampling consumes the
/// random source identically on every run.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightTable {
    entries: Vec<(CrimeType, f64)>,
}

impl WeightTable {
    /// Builds a table from explicit entries.
    ///
    /// # Errors
    ///
    /// * [`WeightError::Empty`] if `entries` is empty
    /// * [`WeightError::Negative`] if a weight is negative, NaN or infinite
    /// * [`WeightError::Duplicate`] if a type appears twice
    pub fn new(mut entries: Vec<(CrimeType, f64)>) -> Result<Self, WeightError> {
        if entries.is_empty() {
            return Err(WeightError::Empty);
        }

        entries.sort_by_key(|(crime_type, _)| *crime_type);
        for pair in entries.windows(2) {
            if pair[0].0 == pair[1].0 {
                return Err(WeightError::Duplicate {
                    crime_type: pair[0].0,
                });
            }
        }

        if let Some(&(crime_type, weight)) = entries
            .iter()
            .find(|(_, w)| !w.is_finite() || *w < 0.0)
        {
            return Err(WeightError::Negative { crime_type, weight });
        }

        Ok(Self { entries })
    }

    /// The built-in skewed distribution (`THEFT` most common, `HOMICIDE`
    /// rarest).
    #[must_use]
    pub fn realistic() -> Self {
        Self {
            entries: CrimeType::all()
                .iter()
                .map(|&t| (t, t.realistic_weight()))
                .collect(),
        }
    }

    /// Equal probability for every crime type.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn uniform() -> Self {
        let all = CrimeType::all();
        let weight = 1.0 / all.len() as f64;
        Self {
            entries: all.iter().map(|&t| (t, weight)).collect(),
        }
    }

    /// Entries in canonical type order.
    #[must_use]
    pub fn entries(&self) -> &[(CrimeType, f64)] {
        &self.entries
    }

    /// Weight of a single type, `0.0` if the table has no entry for it.
    #[must_use]
    pub fn weight(&self, crime_type: CrimeType) -> f64 {
        self.entries
            .iter()
            .find(|(t, _)| *t == crime_type)
            .map_or(0.0, |(_, w)| *w)
    }

    /// Sum of all weights.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.entries.iter().map(|(_, w)| w).sum()
    }

    /// Checks that the weights form a probability distribution.
    ///
    /// # Errors
    ///
    /// Returns [`WeightError::NotNormalized`] if the total deviates from 1
    /// by more than [`SUM_TOLERANCE`].
    pub fn ensure_normalized(&self) -> Result<(), WeightError> {
        let total = self.total();
        if (total - 1.0).abs() > SUM_TOLERANCE {
            return Err(WeightError::NotNormalized { total });
        }
        Ok(())
    }
}

impl fmt::Display for WeightTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (crime_type, weight)) in self.entries.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{crime_type}: {weight:.4}")?;
        }
        Ok(())
    }
}

/// Parses a `LABEL:WEIGHT,LABEL:WEIGHT` override string.
///
/// Labels are matched case-insensitively against the crime types and may
/// contain spaces (`"criminal damage:0.2"`). Empty items (e.g. from a
/// trailing comma) are ignored.
///
/// # Errors
///
/// Returns a [`WeightError`] for a malformed entry, unknown label,
/// non-numeric weight, weight outside [0, 1] or a repeated type.
pub fn parse_custom(input: &str) -> Result<BTreeMap<CrimeType, f64>, WeightError> {
    let mut custom = BTreeMap::new();

    for entry in input.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let Some((label, value)) = entry.split_once(':') else {
            return Err(WeightError::Malformed {
                entry: entry.to_string(),
            });
        };
        if value.contains(':') {
            return Err(WeightError::Malformed {
                entry: entry.to_string(),
            });
        }

        let crime_type = CrimeType::from_label(label).ok_or_else(|| WeightError::UnknownType {
            label: label.trim().to_string(),
        })?;

        let weight: f64 = value
            .trim()
            .parse()
            .map_err(|_| WeightError::InvalidNumber {
                crime_type,
                value: value.trim().to_string(),
            })?;

        if !(0.0..=1.0).contains(&weight) {
            return Err(WeightError::OutOfRange { crime_type, weight });
        }

        if custom.insert(crime_type, weight).is_some() {
            return Err(WeightError::Duplicate { crime_type });
        }
    }

    if custom.is_empty() {
        return Err(WeightError::Empty);
    }

    Ok(custom)
}

/// Merges custom weights into `base`.
///
/// Custom weights are kept as given. The remaining mass `1 - sum(custom)`
/// is split over the other types proportionally to their weight in
/// `base`, or evenly if those base weights are all zero.
///
/// # Errors
///
/// * [`WeightError::SumExceedsOne`] if the custom weights exceed 1
/// * [`WeightError::NoRemainder`] if every type is specified and the sum
///   is not 1
/// * [`WeightError::NotNormalized`] if the merged table does not sum to 1
#[allow(clippy::cast_precision_loss)]
pub fn merge_custom(
    base: &WeightTable,
    custom: &BTreeMap<CrimeType, f64>,
) -> Result<WeightTable, WeightError> {
    let custom_total: f64 = custom.values().sum();
    if custom_total > 1.0 + SUM_TOLERANCE {
        return Err(WeightError::SumExceedsOne {
            total: custom_total,
        });
    }

    let unspecified: Vec<CrimeType> = CrimeType::all()
        .iter()
        .copied()
        .filter(|t| !custom.contains_key(t))
        .collect();

    if unspecified.is_empty() && (custom_total - 1.0).abs() > SUM_TOLERANCE {
        return Err(WeightError::NoRemainder {
            total: custom_total,
        });
    }

    let remaining = (1.0 - custom_total).max(0.0);
    let base_total: f64 = unspecified.iter().map(|&t| base.weight(t)).sum();

    let entries = CrimeType::all()
        .iter()
        .map(|&t| {
            let weight = custom.get(&t).copied().unwrap_or_else(|| {
                if base_total > 0.0 {
                    base.weight(t) / base_total * remaining
                } else {
                    remaining / unspecified.len() as f64
                }
            });
            (t, weight)
        })
        .collect();

    let merged = WeightTable::new(entries)?;
    merged.ensure_normalized()?;
    Ok(merged)
}

/// Resolves the table a run samples from: the realistic table, with
/// `custom` merged in when given.
///
/// # Errors
///
/// Propagates parse and merge failures from [`parse_custom`] and
/// [`merge_custom`].
pub fn resolve(custom: Option<&str>) -> Result<WeightTable, WeightError> {
    let base = WeightTable::realistic();
    match custom {
        None => Ok(base),
        Some(raw) => merge_custom(&base, &parse_custom(raw)?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn realistic_and_uniform_are_normalized() {
        WeightTable::realistic().ensure_normalized().unwrap();
        WeightTable::uniform().ensure_normalized().unwrap();
    }

    #[test]
    fn merge_keeps_custom_and_spreads_remainder_proportionally() {
        let table = resolve(Some("ASSAULT:0.5,ROBBERY:0.2")).unwrap();

        assert!((table.weight(CrimeType::Assault) - 0.5).abs() < 1e-12);
        assert!((table.weight(CrimeType::Robbery) - 0.2).abs() < 1e-12);
        assert!((table.total() - 1.0).abs() < SUM_TOLERANCE);

        // Remaining base weights: 0.35 + 0.20 + 0.15 + 0.09 + 0.01 = 0.80
        let expected_theft = 0.35 / 0.80 * 0.3;
        assert!((table.weight(CrimeType::Theft) - expected_theft).abs() < 1e-12);
        let expected_homicide = 0.01 / 0.80 * 0.3;
        assert!((table.weight(CrimeType::Homicide) - expected_homicide).abs() < 1e-12);
    }

    #[test]
    fn labels_are_case_insensitive_and_may_contain_spaces() {
        let custom = parse_custom(" theft : 0.4 , Criminal Damage:0.1,").unwrap();
        assert_eq!(custom.len(), 2);
        assert!((custom[&CrimeType::Theft] - 0.4).abs() < f64::EPSILON);
        assert!((custom[&CrimeType::CriminalDamage] - 0.1).abs() < f64::EPSILON);
    }

    #[test]
    fn non_numeric_weight_is_rejected() {
        assert_eq!(
            parse_custom("THEFT:abc"),
            Err(WeightError::InvalidNumber {
                crime_type: CrimeType::Theft,
                value: "abc".to_string(),
            })
        );
    }

    #[test]
    fn malformed_entries_are_rejected() {
        assert!(matches!(
            parse_custom("THEFT"),
            Err(WeightError::Malformed { .. })
        ));
        assert!(matches!(
            parse_custom("THEFT:0.1:0.2"),
            Err(WeightError::Malformed { .. })
        ));
        assert_eq!(parse_custom(" , "), Err(WeightError::Empty));
    }

    #[test]
    fn unknown_and_duplicate_types_are_rejected() {
        assert_eq!(
            parse_custom("ARSON:0.1"),
            Err(WeightError::UnknownType {
                label: "ARSON".to_string()
            })
        );
        assert_eq!(
            parse_custom("THEFT:0.1,theft:0.2"),
            Err(WeightError::Duplicate {
                crime_type: CrimeType::Theft
            })
        );
    }

    #[test]
    fn weights_outside_unit_interval_are_rejected() {
        assert!(matches!(
            parse_custom("THEFT:1.5"),
            Err(WeightError::OutOfRange { .. })
        ));
        assert!(matches!(
            parse_custom("THEFT:-0.1"),
            Err(WeightError::OutOfRange { .. })
        ));
        assert!(matches!(
            parse_custom("THEFT:NaN"),
            Err(WeightError::OutOfRange { .. })
        ));
    }

    #[test]
    fn custom_sum_above_one_is_rejected() {
        assert!(matches!(
            resolve(Some("THEFT:0.7,ROBBERY:0.4")),
            Err(WeightError::SumExceedsOne { .. })
        ));
    }

    #[test]
    fn fully_specified_table_must_sum_to_one() {
        let all_but_sum = "THEFT:0.1,BATTERY:0.1,CRIMINAL DAMAGE:0.1,ASSAULT:0.1,\
                           ROBBERY:0.1,NARCOTICS:0.1,HOMICIDE:0.1";
        assert!(matches!(
            resolve(Some(all_but_sum)),
            Err(WeightError::NoRemainder { .. })
        ));

        let exact = "THEFT:0.4,BATTERY:0.1,CRIMINAL DAMAGE:0.1,ASSAULT:0.1,\
                     ROBBERY:0.1,NARCOTICS:0.1,HOMICIDE:0.1";
        let table = resolve(Some(exact)).unwrap();
        assert!((table.weight(CrimeType::Theft) - 0.4).abs() < 1e-12);
    }

    #[test]
    fn custom_sum_of_one_zeroes_the_rest() {
        let table = resolve(Some("THEFT:0.6,HOMICIDE:0.4")).unwrap();
        assert!(table.weight(CrimeType::Battery).abs() < f64::EPSILON);
        assert!((table.total() - 1.0).abs() < SUM_TOLERANCE);
    }

    #[test]
    fn remainder_is_split_evenly_when_base_weights_are_zero() {
        let base = WeightTable::new(vec![
            (CrimeType::Theft, 1.0),
            (CrimeType::Battery, 0.0),
            (CrimeType::CriminalDamage, 0.0),
            (CrimeType::Assault, 0.0),
            (CrimeType::Robbery, 0.0),
            (CrimeType::Narcotics, 0.0),
            (CrimeType::Homicide, 0.0),
        ])
        .unwrap();
        let custom = BTreeMap::from([(CrimeType::Theft, 0.4)]);
        let merged = merge_custom(&base, &custom).unwrap();
        assert!((merged.weight(CrimeType::Battery) - 0.1).abs() < 1e-12);
        assert!((merged.total() - 1.0).abs() < SUM_TOLERANCE);
    }

    #[test]
    fn table_rejects_empty_negative_and_duplicate_entries() {
        assert_eq!(WeightTable::new(Vec::new()), Err(WeightError::Empty));
        assert!(matches!(
            WeightTable::new(vec![(CrimeType::Theft, -0.5)]),
            Err(WeightError::Negative { .. })
        ));
        assert!(matches!(
            WeightTable::new(vec![(CrimeType::Theft, 0.5), (CrimeType::Theft, 0.5)]),
            Err(WeightError::Duplicate { .. })
        ));
    }

    #[test]
    fn table_entries_are_kept_in_canonical_order() {
        let table = WeightTable::new(vec![
            (CrimeType::Homicide, 0.5),
            (CrimeType::Theft, 0.5),
        ])
        .unwrap();
        assert_eq!(table.entries()[0].0, CrimeType::Theft);
        assert_eq!(table.entries()[1].0, CrimeType::Homicide);
    }
}
