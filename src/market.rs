use crate::config::MarketParams;
use crate::incentives::Incentives;
use crate::model::Style;
use crate::pool::AgentPool;
use anyhow::{Context, Result};
use rand::prelude::*;
use rand_distr::Uniform;
use serde::{Deserialize, Serialize};

/// Outcome of a market shift.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketShift {
    /// Style favored by the new era.
    pub era: Style,
    /// Base payoffs after the shift, indexed by [`Style::index`].
    pub base: [f64; 2],
    /// Number of agents credited with the era bonus.
    pub n_agt_bonus: usize,
}

/// Exogenous market shift injector.
///
/// Fires on 1-indexed steps that are multiples of its interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketShiftInjector {
    interval: usize,
    params: MarketParams,
    n_shifts: usize,
}

impl MarketShiftInjector {
    pub fn new(interval: usize, params: MarketParams) -> Self {
        Self {
            interval,
            params,
            n_shifts: 0,
        }
    }

    pub fn fires(&self, step: usize) -> bool {
        step > 0 && step % self.interval == 0
    }

    pub fn n_shifts(&self) -> usize {
        self.n_shifts
    }

    /// Redraw base payoffs and open a new era if `step` is a shift step.
    pub fn maybe_shift<R: Rng + ?Sized>(
        &mut self,
        step: usize,
        incentives: &mut Incentives,
        pool: &mut AgentPool,
        rng: &mut R,
    ) -> Result<Option<MarketShift>> {
        if !self.fires(step) {
            return Ok(None);
        }

        let payoff_dist = Uniform::new(self.params.payoff_min, self.params.payoff_max)?;
        for style in Style::ALL {
            incentives.set_base(style, payoff_dist.sample(rng));
        }

        let &era = Style::ALL
            .choose(rng)
            .context("failed to choose an era style")?;
        incentives.set_era(era);

        let mut n_agt_bonus = 0;
        for agt in pool.agents_mut().iter_mut().filter(|agt| agt.style() == era) {
            agt.credit(self.params.era_bonus);
            n_agt_bonus += 1;
        }

        self.n_shifts += 1;

        Ok(Some(MarketShift {
            era,
            base: [incentives.base(Style::Neutral), incentives.base(Style::Signaling)],
            n_agt_bonus,
        }))
    }
}
