use crate::config::EvolutionParams;
use crate::model::{Style, StyleDistribution};
use crate::pool::AgentPool;
use anyhow::{Context, Result};
use rand::prelude::*;
use rand_distr::Bernoulli;
use serde::{Deserialize, Serialize};

/// Smallest population for which evolution rounds take place.
const MIN_N_AGT: usize = 5;

/// Outcome of an evolution round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evolution {
    /// Number of low-payoff agents that imitated an elite.
    pub n_imitators: usize,
    /// Number of imitators whose adopted style mutated.
    pub n_mutations: usize,
    /// Style distribution after the round.
    pub distribution: StyleDistribution,
}

/// Evolutionary selector.
///
/// Low-payoff agents copy the style of a random high-payoff agent and start
/// accumulating payoff again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evolver {
    params: EvolutionParams,
}

impl Evolver {
    pub fn new(params: EvolutionParams) -> Self {
        Self { params }
    }

    pub fn fires(&self, step: usize) -> bool {
        step > 0 && step % self.params.interval == 0
    }

    pub fn maybe_evolve<R: Rng + ?Sized>(
        &self,
        step: usize,
        pool: &mut AgentPool,
        rng: &mut R,
    ) -> Result<Option<Evolution>> {
        if !self.fires(step) {
            return Ok(None);
        }
        self.evolve(pool, rng)
    }

    /// Perform one round of selection and imitation.
    ///
    /// Returns `None` if the population is too small to select from.
    pub fn evolve<R: Rng + ?Sized>(
        &self,
        pool: &mut AgentPool,
        rng: &mut R,
    ) -> Result<Option<Evolution>> {
        let n_agt = pool.len();
        let n_sel = (n_agt as f64 * self.params.selection_share).floor() as usize;
        if n_agt < MIN_N_AGT || n_sel == 0 {
            return Ok(None);
        }

        // Rank by payoff (descending), ties broken by id.
        let agents = pool.agents();
        let mut ranking: Vec<usize> = (0..n_agt).collect();
        ranking.sort_by(|&a, &b| {
            agents[b]
                .payoff()
                .total_cmp(&agents[a].payoff())
                .then(agents[a].id().cmp(&agents[b].id()))
        });

        let elite_styles: Vec<Style> = ranking[..n_sel]
            .iter()
            .map(|&i_agt| agents[i_agt].style())
            .collect();

        let mut_dist = Bernoulli::new(self.params.mutation_rate)?;
        let mut n_mutations = 0;

        let agents = pool.agents_mut();
        for &i_agt in &ranking[n_agt - n_sel..] {
            let mut style = *elite_styles
                .choose(rng)
                .context("failed to choose an elite")?;

            if mut_dist.sample(rng) {
                style = *Style::ALL
                    .choose(rng)
                    .context("failed to choose a mutated style")?;
                n_mutations += 1;
            }

            let agt = &mut agents[i_agt];
            agt.set_style(style);
            agt.reset_payoff();
        }

        Ok(Some(Evolution {
            n_imitators: n_sel,
            n_mutations,
            distribution: pool.distribution(),
        }))
    }
}
