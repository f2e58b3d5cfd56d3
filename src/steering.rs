use crate::config::SteeringParams;
use crate::incentives::Incentives;
use crate::model::{Style, StyleDistribution};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SteeringPhase {
    Idle,
    Recalibrating,
}

/// Outcome of a steering firing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recalibration {
    /// Dominant style observed (`None` on a tie or an empty population).
    pub dominant: Option<Style>,
    /// Style targeted after the firing.
    pub target: Option<Style>,
    /// Penalties after the firing, indexed by [`Style::index`].
    pub penalties: [f64; 2],
}

impl Recalibration {
    /// Whether the firing left the incentives untouched.
    ///
    /// Only a signaling majority is steered against.
    pub fn is_noop(&self) -> bool {
        self.dominant != Some(Style::Signaling)
    }
}

/// Adaptive steering controller.
///
/// Every `interval` ticks it raises the penalty on the signaling style if
/// signaling is dominant. A neutral majority, a tie or an empty population
/// leaves the incentives as they are.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SteeringController {
    interval: usize,
    params: SteeringParams,
    phase: SteeringPhase,
    target: Option<Style>,
    steps_since: usize,
    n_recalibrations: usize,
}

impl SteeringController {
    pub fn new(interval: usize, params: SteeringParams) -> Self {
        Self {
            interval,
            params,
            phase: SteeringPhase::Idle,
            target: None,
            steps_since: 0,
            n_recalibrations: 0,
        }
    }

    pub fn phase(&self) -> SteeringPhase {
        self.phase
    }

    pub fn target(&self) -> Option<Style> {
        self.target
    }

    pub fn n_recalibrations(&self) -> usize {
        self.n_recalibrations
    }

    /// Count one step and recalibrate if the interval has elapsed.
    pub fn tick(
        &mut self,
        dist: &StyleDistribution,
        incentives: &mut Incentives,
    ) -> Option<Recalibration> {
        self.steps_since += 1;
        if self.steps_since < self.interval {
            return None;
        }
        self.steps_since = 0;

        self.phase = SteeringPhase::Recalibrating;
        let recalibration = self.recalibrate(dist, incentives);
        self.phase = SteeringPhase::Idle;

        Some(recalibration)
    }

    fn recalibrate(&mut self, dist: &StyleDistribution, incentives: &mut Incentives) -> Recalibration {
        debug_assert_eq!(self.phase, SteeringPhase::Recalibrating);
        self.n_recalibrations += 1;

        let dominant = dist.dominant();
        if dominant == Some(Style::Signaling) {
            let penalty = (incentives.penalty(Style::Signaling) + self.params.penalty_step)
                .min(self.params.max_penalty);
            incentives.set_penalty(Style::Signaling, penalty);

            self.target = Some(Style::Signaling);
        }

        Recalibration {
            dominant,
            target: self.target,
            penalties: incentives.penalties(),
        }
    }
}
