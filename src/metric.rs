use crate::model::{Style, StyleDistribution};
use serde::{Deserialize, Serialize};

/// Distance of the population from the all-neutral equilibrium.
///
/// Always in `[0, 1]`: 0 when every agent is neutral, 1 when every agent signals.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct NashDistance(f64);

impl NashDistance {
    /// Clamp `val` into `[0, 1]` (NaN maps to 0).
    pub fn new(val: f64) -> Self {
        if val.is_nan() {
            return Self(0.0);
        }
        Self(val.clamp(0.0, 1.0))
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

/// Compute the Nash distance of a style distribution.
pub fn nash_distance(dist: &StyleDistribution) -> NashDistance {
    NashDistance::new(dist.fraction(Style::Signaling))
}

/// Metric values recorded at a single step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRecord {
    /// Simulation step (1-indexed).
    pub step: usize,
    pub distance: NashDistance,
    /// Shannon entropy of the style distribution in bits.
    pub diversity: f64,
    pub distribution: StyleDistribution,
}

impl MetricRecord {
    pub fn new(step: usize, dist: StyleDistribution) -> Self {
        Self {
            step,
            distance: nash_distance(&dist),
            diversity: dist.diversity(),
            distribution: dist,
        }
    }
}

/// Append-only sequence of metric records, one per step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricHistory {
    records: Vec<MetricRecord>,
}

impl MetricHistory {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, record: MetricRecord) {
        debug_assert!(
            self.records.last().is_none_or(|last| last.step < record.step),
            "steps must be strictly increasing"
        );
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[MetricRecord] {
        &self.records
    }

    /// Record of the given step, if it was simulated.
    pub fn get(&self, step: usize) -> Option<&MetricRecord> {
        let i_rec = self.records.binary_search_by_key(&step, |rec| rec.step).ok()?;
        self.records.get(i_rec)
    }

    /// Nash distance values in step order.
    pub fn distances(&self) -> Vec<f64> {
        self.records.iter().map(|rec| rec.distance.value()).collect()
    }
}
