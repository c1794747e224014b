//! Draws crime types from a [`WeightTable`].

use crime_bench_crime_models::CrimeType;
use crime_bench_generator_models::SamplingMode;
use rand::Rng;
use rand::distributions::{Distribution as _, WeightedIndex};

use crate::weights::{WeightError, WeightTable};

/// Category sampler for one generation run.
///
/// In [`SamplingMode::Weighted`] draws follow the table's probabilities; in
/// [`SamplingMode::Uniform`] every type in the table is equally likely and
/// the weights are ignored.
#[derive(Debug, Clone)]
pub struct WeightedSampler {
    categories: Vec<CrimeType>,
    mode: SamplingMode,
    index: WeightedIndex<f64>,
}

impl WeightedSampler {
    /// Creates a sampler over `table`.
    ///
    /// # Errors
    ///
    /// * [`WeightError::Empty`] if the table has no entries
    /// * [`WeightError::Negative`] if a weight is negative or not finite
    /// * [`WeightError::AllZero`] if no weight is positive
    pub fn new(table: &WeightTable, mode: SamplingMode) -> Result<Self, WeightError> {
        let entries = table.entries();
        if entries.is_empty() {
            return Err(WeightError::Empty);
        }
        if let Some(&(crime_type, weight)) = entries
            .iter()
            .find(|(_, w)| !w.is_finite() || *w < 0.0)
        {
            return Err(WeightError::Negative { crime_type, weight });
        }

        let index = WeightedIndex::new(entries.iter().map(|(_, w)| *w))
            .map_err(|_| WeightError::AllZero)?;

        Ok(Self {
            categories: entries.iter().map(|(t, _)| *t).collect(),
            mode,
            index,
        })
    }

    /// Draws one crime type.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> CrimeType {
        let i = match self.mode {
            SamplingMode::Weighted => self.index.sample(rng),
            SamplingMode::Uniform => rng.gen_range(0..self.categories.len()),
        };
        self.categories[i]
    }
}
