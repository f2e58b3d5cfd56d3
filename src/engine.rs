use crate::config::Config;
use crate::evolution::{Evolution, Evolver};
use crate::incentives::Incentives;
use crate::market::{MarketShift, MarketShiftInjector};
use crate::metric::{MetricHistory, MetricRecord};
use crate::pool::AgentPool;
use crate::stats::Summary;
use crate::steering::{Recalibration, SteeringController};
use anyhow::{Context, Result, bail};
use rand::prelude::*;
use rand_chacha::ChaCha12Rng;
use serde::{Deserialize, Serialize};

/// Something that happened at a given step besides the agents' own updates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub step: usize,
    pub kind: EventKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EventKind {
    Recalibration(Recalibration),
    MarketShift(MarketShift),
    Evolution(Evolution),
}

/// Everything a finished run produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunOutput {
    pub seed: u64,
    pub history: MetricHistory,
    pub events: Vec<Event>,
    pub summary: Summary,
}

/// Simulation engine.
///
/// Holds the configuration, agents, incentive state, controllers and random
/// number generator, and provides methods to run, snapshot and restore
/// simulations.
#[derive(Serialize, Deserialize)]
pub struct Engine {
    cfg: Config,
    seed: u64,
    step: usize,
    pool: AgentPool,
    incentives: Incentives,
    steering: SteeringController,
    market: MarketShiftInjector,
    evolver: Evolver,
    history: MetricHistory,
    events: Vec<Event>,
    rng: ChaCha12Rng,
}

impl Engine {
    /// Create a new `Engine` with the given configuration and a random initial population.
    ///
    /// If the configuration has no seed, one is drawn from OS entropy and logged.
    pub fn new(cfg: Config) -> Result<Self> {
        cfg.validate().context("failed to validate config")?;

        let seed = match cfg.seed {
            Some(seed) => seed,
            None => {
                let seed = rand::random();
                log::info!("no seed configured, using {seed}");
                seed
            }
        };
        let mut rng = ChaCha12Rng::seed_from_u64(seed);

        let pool = AgentPool::new(cfg.population_size, cfg.agents.signaling_share, &mut rng)
            .context("failed to create agent pool")?;

        Ok(Self {
            seed,
            step: 0,
            pool,
            incentives: Incentives::new(&cfg.market),
            steering: SteeringController::new(cfg.recalibration_interval, cfg.steering.clone()),
            market: MarketShiftInjector::new(cfg.shift_interval, cfg.market.clone()),
            evolver: Evolver::new(cfg.evolution.clone()),
            history: MetricHistory::with_capacity(cfg.total_steps),
            events: Vec::new(),
            rng,
            cfg,
        })
    }

    /// Perform a single simulation step.
    pub fn perform_step(&mut self) -> Result<()> {
        if self.is_finished() {
            bail!("simulation already completed {} steps", self.cfg.total_steps);
        }
        let step = self.step + 1;

        // Agents collect payoffs and revise their styles.
        self.pool
            .step(&self.incentives, &self.cfg.agents, &mut self.rng)
            .context("failed to step agent pool")?;

        // Record the metric for this step.
        let dist = self.pool.distribution();
        let record = MetricRecord::new(step, dist);
        log::debug!(
            "step {step}: distance {:.3}, diversity {:.3}",
            record.distance.value(),
            record.diversity
        );
        self.history.push(record);

        // Steering recalibration.
        if let Some(recalibration) = self.steering.tick(&dist, &mut self.incentives) {
            match recalibration.target {
                Some(target) if !recalibration.is_noop() => {
                    log::info!(
                        "step {step}: steering against {target}, penalties {:?}",
                        recalibration.penalties
                    );
                }
                _ => log::info!("step {step}: steering left incentives unchanged"),
            }
            self.push_event(step, EventKind::Recalibration(recalibration));
        }

        // Market shift.
        let shift = self
            .market
            .maybe_shift(step, &mut self.incentives, &mut self.pool, &mut self.rng)
            .context("failed to shift market")?;
        if let Some(shift) = shift {
            log::info!(
                "step {step}: market shift to {} era, base payoffs {:?}",
                shift.era,
                shift.base
            );
            self.push_event(step, EventKind::MarketShift(shift));
        }

        // Evolutionary imitation.
        let evolution = self
            .evolver
            .maybe_evolve(step, &mut self.pool, &mut self.rng)
            .context("failed to evolve population")?;
        if let Some(evolution) = evolution {
            log::debug!(
                "step {step}: {} imitators, {} mutations",
                evolution.n_imitators,
                evolution.n_mutations
            );
            self.push_event(step, EventKind::Evolution(evolution));
        }

        self.step = step;

        Ok(())
    }

    /// Perform up to `n_steps` steps, stopping at the configured total.
    pub fn run(&mut self, n_steps: usize) -> Result<()> {
        let n_steps = n_steps.min(self.remaining_steps());
        for _ in 0..n_steps {
            self.perform_step()
                .with_context(|| format!("failed to perform step {}", self.step + 1))?;
        }
        Ok(())
    }

    /// Perform all remaining steps and return the run output.
    pub fn run_to_end(mut self) -> Result<RunOutput> {
        const N_REPORTS: usize = 10;
        let steps_per_report = (self.cfg.total_steps / N_REPORTS).max(1);

        while !self.is_finished() {
            self.run(steps_per_report)?;

            let progress = 100.0 * self.step as f64 / self.cfg.total_steps as f64;
            log::info!("completed {progress:06.2}%");
        }

        self.into_output()
    }

    /// Consume the engine and return what it has produced so far.
    pub fn into_output(self) -> Result<RunOutput> {
        let summary = self.summary()?;
        Ok(RunOutput {
            seed: self.seed,
            history: self.history,
            events: self.events,
            summary,
        })
    }

    /// Summary statistics of the Nash distance recorded so far.
    pub fn summary(&self) -> Result<Summary> {
        Summary::new(&self.history.distances(), &self.cfg.analysis)
            .context("failed to summarize history")
    }

    /// Encode the entire engine state, including the random number generator.
    ///
    /// Can be used to resume the simulation later with [`Engine::restore`].
    pub fn snapshot(&self) -> Result<Vec<u8>> {
        rmp_serde::to_vec(self).context("failed to serialize engine")
    }

    /// Decode a previously taken engine snapshot.
    pub fn restore(bytes: &[u8]) -> Result<Self> {
        let engine: Engine =
            rmp_serde::from_slice(bytes).context("failed to deserialize engine")?;
        engine
            .cfg
            .validate()
            .context("snapshot holds an invalid config")?;
        Ok(engine)
    }

    pub fn cfg(&self) -> &Config {
        &self.cfg
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Number of steps performed so far.
    pub fn step(&self) -> usize {
        self.step
    }

    pub fn is_finished(&self) -> bool {
        self.step >= self.cfg.total_steps
    }

    pub fn remaining_steps(&self) -> usize {
        self.cfg.total_steps.saturating_sub(self.step)
    }

    pub fn pool(&self) -> &AgentPool {
        &self.pool
    }

    pub fn incentives(&self) -> &Incentives {
        &self.incentives
    }

    pub fn steering(&self) -> &SteeringController {
        &self.steering
    }

    pub fn history(&self) -> &MetricHistory {
        &self.history
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    fn push_event(&mut self, step: usize, kind: EventKind) {
        self.events.push(Event { step, kind });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Style;
    use crate::steering::SteeringPhase;

    fn reference_config() -> Config {
        Config::new(1000, 100, 200, 50, Some(42)).unwrap()
    }

    fn event_steps(events: &[Event], pred: fn(&EventKind) -> bool) -> Vec<usize> {
        events
            .iter()
            .filter(|event| pred(&event.kind))
            .map(|event| event.step)
            .collect()
    }

    #[test]
    fn reference_run_matches_its_summary() {
        let output = Engine::new(reference_config()).unwrap().run_to_end().unwrap();
        let history = &output.history;
        let summary = &output.summary;

        assert_eq!(output.seed, 42);
        assert_eq!(history.len(), 1000);
        assert_eq!(summary.start, history.get(1).unwrap().distance.value());
        assert_eq!(summary.end, history.get(1000).unwrap().distance.value());
        for rec in history.records() {
            let val = rec.distance.value();
            assert!((0.0..=1.0).contains(&val));
            assert!(summary.min <= val && val <= summary.max);
            assert_eq!(rec.distribution.total(), 50);
        }
        let steps: Vec<_> = history.records().iter().map(|rec| rec.step).collect();
        assert_eq!(steps, (1..=1000).collect::<Vec<_>>());
    }

    #[test]
    fn controllers_fire_on_schedule() {
        let output = Engine::new(reference_config()).unwrap().run_to_end().unwrap();

        let steering = event_steps(&output.events, |kind| {
            matches!(kind, EventKind::Recalibration(_))
        });
        assert_eq!(steering, (1..=10).map(|i| 100 * i).collect::<Vec<_>>());

        let market = event_steps(&output.events, |kind| {
            matches!(kind, EventKind::MarketShift(_))
        });
        assert_eq!(market, vec![200, 400, 600, 800, 1000]);

        let evolution = event_steps(&output.events, |kind| matches!(kind, EventKind::Evolution(_)));
        assert_eq!(evolution, (1..=10).map(|i| 100 * i).collect::<Vec<_>>());
    }

    #[test]
    fn steering_never_penalizes_neutral() {
        let output = Engine::new(reference_config()).unwrap().run_to_end().unwrap();

        let mut last_penalty = 0.0;
        for event in &output.events {
            let EventKind::Recalibration(recalibration) = &event.kind else {
                continue;
            };
            assert_eq!(recalibration.penalties[Style::Neutral.index()], 0.0);
            let penalty = recalibration.penalties[Style::Signaling.index()];
            assert!(penalty >= last_penalty, "step {}", event.step);
            if recalibration.is_noop() {
                assert_eq!(penalty, last_penalty, "step {}", event.step);
            }
            last_penalty = penalty;
        }
    }

    #[test]
    fn identical_seed_gives_identical_history() {
        let first = Engine::new(reference_config()).unwrap().run_to_end().unwrap();
        let second = Engine::new(reference_config()).unwrap().run_to_end().unwrap();
        assert_eq!(first.history, second.history);
        assert_eq!(first.events, second.events);
        assert_eq!(first.summary, second.summary);
    }

    #[test]
    fn different_seeds_diverge() {
        let first = Engine::new(reference_config()).unwrap().run_to_end().unwrap();
        let mut cfg = reference_config();
        cfg.seed = Some(43);
        let second = Engine::new(cfg).unwrap().run_to_end().unwrap();
        assert_ne!(first.history, second.history);
    }

    #[test]
    fn restored_snapshot_continues_identically() {
        let uninterrupted = Engine::new(reference_config()).unwrap().run_to_end().unwrap();

        let mut engine = Engine::new(reference_config()).unwrap();
        engine.run(437).unwrap();
        let bytes = engine.snapshot().unwrap();
        drop(engine);

        let restored = Engine::restore(&bytes).unwrap();
        assert_eq!(restored.step(), 437);
        assert_eq!(restored.history().len(), 437);
        let resumed = restored.run_to_end().unwrap();

        assert_eq!(resumed.history, uninterrupted.history);
        assert_eq!(resumed.events, uninterrupted.events);
    }

    #[test]
    fn run_stops_at_total_steps() {
        let cfg = Config::new(30, 10, 20, 8, Some(1)).unwrap();
        let mut engine = Engine::new(cfg).unwrap();
        engine.run(100).unwrap();
        assert!(engine.is_finished());
        assert_eq!(engine.history().len(), 30);
        assert!(engine.perform_step().is_err());
        assert_eq!(engine.steering().phase(), SteeringPhase::Idle);
        assert_eq!(engine.steering().n_recalibrations(), 3);
    }

    #[test]
    fn summary_requires_at_least_one_step() {
        let engine = Engine::new(reference_config()).unwrap();
        assert!(engine.summary().is_err());
    }

    #[test]
    fn invalid_config_is_rejected_at_start() {
        let mut cfg = reference_config();
        cfg.shift_interval = 0;
        assert!(Engine::new(cfg).is_err());
    }

    #[test]
    fn single_agent_population_runs() {
        let cfg = Config::new(250, 100, 200, 1, Some(5)).unwrap();
        let output = Engine::new(cfg).unwrap().run_to_end().unwrap();
        assert_eq!(output.history.len(), 250);
        for rec in output.history.records() {
            let val = rec.distance.value();
            assert!(val == 0.0 || val == 1.0);
        }
    }
}
