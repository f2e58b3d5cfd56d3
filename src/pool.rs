use crate::config::AgentParams;
use crate::incentives::Incentives;
use crate::model::{Agent, Style, StyleDistribution};
use anyhow::{Context, Result, bail};
use rand::prelude::*;
use rand_distr::{Bernoulli, Normal};
use serde::{Deserialize, Serialize};

/// Fixed population of agents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentPool {
    agt_vec: Vec<Agent>,
}

impl AgentPool {
    /// Create `n_agt` agents, each signaling with probability `signaling_share`.
    pub fn new<R: Rng + ?Sized>(n_agt: usize, signaling_share: f64, rng: &mut R) -> Result<Self> {
        if n_agt == 0 {
            bail!("number of agents must be positive");
        }

        let style_dist = Bernoulli::new(signaling_share)?;
        let agt_vec = (0..n_agt)
            .map(|id| {
                let style = if style_dist.sample(rng) {
                    Style::Signaling
                } else {
                    Style::Neutral
                };
                Agent::new(id, style)
            })
            .collect();

        Ok(Self { agt_vec })
    }

    /// Wrap existing agents into a pool.
    pub fn from_agents(agt_vec: Vec<Agent>) -> Result<Self> {
        if agt_vec.is_empty() {
            bail!("number of agents must be positive");
        }
        Ok(Self { agt_vec })
    }

    /// Advance every agent by one step under the given incentives.
    ///
    /// Each agent collects a noisy payoff for its current style and, with
    /// probability `revision_rate`, reconsiders its style with a logit rule.
    pub fn step<R: Rng + ?Sized>(
        &mut self,
        incentives: &Incentives,
        params: &AgentParams,
        rng: &mut R,
    ) -> Result<()> {
        let noise_dist = Normal::new(0.0, params.payoff_noise)?;
        let rev_dist = Bernoulli::new(params.revision_rate)?;

        for agt in &mut self.agt_vec {
            agt.credit(incentives.payoff(agt.style()) + noise_dist.sample(rng));

            if !rev_dist.sample(rng) {
                continue;
            }

            let prob = switch_probability(incentives, agt.style(), params.temperature);
            let switch_dist = Bernoulli::new(prob)
                .with_context(|| format!("invalid switch probability {prob}"))?;
            if switch_dist.sample(rng) {
                agt.set_style(agt.style().other());
            }
        }

        Ok(())
    }

    pub fn distribution(&self) -> StyleDistribution {
        StyleDistribution::from_agents(&self.agt_vec)
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agt_vec
    }

    pub(crate) fn agents_mut(&mut self) -> &mut [Agent] {
        &mut self.agt_vec
    }

    pub fn len(&self) -> usize {
        self.agt_vec.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agt_vec.is_empty()
    }
}

/// Logit probability of leaving `current` for the other style.
fn switch_probability(incentives: &Incentives, current: Style, temperature: f64) -> f64 {
    let gain = incentives.payoff(current.other()) - incentives.payoff(current);
    1.0 / (1.0 + (-gain / temperature).exp())
}
