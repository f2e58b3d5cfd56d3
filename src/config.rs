use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::{fmt::Debug, fs, ops::RangeBounds, path::Path};

/// Simulation configuration parameters.
///
/// Loaded from a TOML file and validated before use.
/// See [`Config::from_file`] for loading.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Number of steps to simulate.
    pub total_steps: usize,
    /// Number of steps between steering recalibrations.
    pub recalibration_interval: usize,
    /// Number of steps between market shifts.
    pub shift_interval: usize,
    /// Number of agents.
    pub population_size: usize,
    /// Random seed (drawn from OS entropy if absent).
    #[serde(default)]
    pub seed: Option<u64>,

    #[serde(default)]
    pub agents: AgentParams,
    #[serde(default)]
    pub steering: SteeringParams,
    #[serde(default)]
    pub market: MarketParams,
    #[serde(default)]
    pub evolution: EvolutionParams,
    #[serde(default)]
    pub analysis: AnalysisParams,
}

/// Agent decision parameters.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AgentParams {
    /// Initial probability of an agent using the signaling style.
    pub signaling_share: f64,
    /// Probability per step that an agent reconsiders its style.
    pub revision_rate: f64,
    /// Logit choice temperature (lower is closer to best response).
    pub temperature: f64,
    /// Standard deviation of the payoff noise.
    pub payoff_noise: f64,
}

impl Default for AgentParams {
    fn default() -> Self {
        Self {
            signaling_share: 0.5,
            revision_rate: 0.1,
            temperature: 0.25,
            payoff_noise: 0.1,
        }
    }
}

/// Steering recalibration parameters.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SteeringParams {
    /// Penalty change applied per recalibration.
    pub penalty_step: f64,
    /// Upper bound of the penalty on any style.
    pub max_penalty: f64,
}

impl Default for SteeringParams {
    fn default() -> Self {
        Self {
            penalty_step: 0.15,
            max_penalty: 1.0,
        }
    }
}

/// Market parameters.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MarketParams {
    /// Initial base payoff of the neutral style.
    pub neutral_payoff: f64,
    /// Initial base payoff of the signaling style.
    pub signaling_payoff: f64,
    /// Lower bound of base payoffs drawn at a market shift.
    pub payoff_min: f64,
    /// Upper bound (exclusive) of base payoffs drawn at a market shift.
    pub payoff_max: f64,
    /// Payoff credited to agents matching the era style at a market shift.
    pub era_bonus: f64,
}

impl Default for MarketParams {
    fn default() -> Self {
        Self {
            neutral_payoff: 1.0,
            signaling_payoff: 1.1,
            payoff_min: 0.8,
            payoff_max: 1.2,
            era_bonus: 2.0,
        }
    }
}

/// Evolutionary imitation parameters.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EvolutionParams {
    /// Number of steps between evolution rounds.
    pub interval: usize,
    /// Fraction of agents selected as elites (and as imitators).
    pub selection_share: f64,
    /// Probability that an imitator adopts a random style instead.
    pub mutation_rate: f64,
}

impl Default for EvolutionParams {
    fn default() -> Self {
        Self {
            interval: 100,
            selection_share: 0.2,
            mutation_rate: 0.1,
        }
    }
}

/// Analysis parameters.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisParams {
    /// Number of trailing steps used by the stability check.
    pub stability_window: usize,
    /// Trailing variance below which the run is considered stable.
    pub stability_threshold: f64,
}

impl Default for AnalysisParams {
    fn default() -> Self {
        Self {
            stability_window: 100,
            stability_threshold: 0.01,
        }
    }
}

impl Config {
    /// Create a validated [`Config`] with default model parameters.
    pub fn new(
        total_steps: usize,
        recalibration_interval: usize,
        shift_interval: usize,
        population_size: usize,
        seed: Option<u64>,
    ) -> Result<Self> {
        let config = Self {
            total_steps,
            recalibration_interval,
            shift_interval,
            population_size,
            seed,
            agents: AgentParams::default(),
            steering: SteeringParams::default(),
            market: MarketParams::default(),
            evolution: EvolutionParams::default(),
            analysis: AnalysisParams::default(),
        };

        config.validate().context("failed to validate config")?;

        Ok(config)
    }

    /// Load a [`Config`] from a file.
    ///
    /// The file must be a TOML document containing a serialized [`Config`].
    /// Performs validation on all parameters before returning.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, deserialized,
    /// or if the configuration values are invalid.
    pub fn from_file<P: AsRef<Path>>(file: P) -> Result<Self> {
        let file = file.as_ref();
        let contents =
            fs::read_to_string(file).with_context(|| format!("failed to read {file:?}"))?;

        Self::from_toml_str(&contents)
    }

    /// Parse and validate a [`Config`] from a TOML string.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents).context("failed to deserialize config")?;

        config.validate().context("failed to validate config")?;

        Ok(config)
    }

    /// Check every parameter against its allowed range.
    pub fn validate(&self) -> Result<()> {
        check_num(self.total_steps, 1..=10_000_000).context("invalid total number of steps")?;
        check_num(self.recalibration_interval, 1..)
            .context("invalid recalibration interval")?;
        check_num(self.shift_interval, 1..).context("invalid market shift interval")?;
        check_num(self.population_size, 1..=1_000_000).context("invalid population size")?;

        let agents = &self.agents;
        check_num(agents.signaling_share, 0.0..=1.0)
            .context("invalid initial signaling share")?;
        check_num(agents.revision_rate, 0.0..=1.0).context("invalid revision rate")?;
        check_num(agents.temperature, 1e-3..=100.0).context("invalid choice temperature")?;
        check_num(agents.payoff_noise, 0.0..=10.0).context("invalid payoff noise")?;

        let steering = &self.steering;
        check_num(steering.penalty_step, 0.0..=10.0).context("invalid penalty step")?;
        check_num(steering.max_penalty, 0.0..=100.0).context("invalid maximum penalty")?;

        let market = &self.market;
        check_num(market.neutral_payoff, -100.0..=100.0)
            .context("invalid initial neutral payoff")?;
        check_num(market.signaling_payoff, -100.0..=100.0)
            .context("invalid initial signaling payoff")?;
        check_num(market.payoff_min, -100.0..=100.0).context("invalid minimum payoff")?;
        check_num(market.payoff_max, -100.0..=100.0).context("invalid maximum payoff")?;
        if market.payoff_min >= market.payoff_max {
            bail!(
                "minimum payoff must be below maximum payoff, but {} >= {}",
                market.payoff_min,
                market.payoff_max
            );
        }
        check_num(market.era_bonus, 0.0..=100.0).context("invalid era bonus")?;

        let evolution = &self.evolution;
        check_num(evolution.interval, 1..).context("invalid evolution interval")?;
        check_num(evolution.selection_share, 0.0..=0.5).context("invalid selection share")?;
        check_num(evolution.mutation_rate, 0.0..=1.0).context("invalid mutation rate")?;

        let analysis = &self.analysis;
        check_num(analysis.stability_window, 1..).context("invalid stability window")?;
        check_num(analysis.stability_threshold, 0.0..=1.0)
            .context("invalid stability threshold")?;

        Ok(())
    }
}

fn check_num<T, R>(num: T, range: R) -> Result<()>
where
    T: PartialOrd + Debug,
    R: RangeBounds<T> + Debug,
{
    if !range.contains(&num) {
        bail!("number must be in the range {range:?}, but is {num:?}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
total_steps = 1000
recalibration_interval = 100
shift_interval = 200
population_size = 50
seed = 42
"#;

    #[test]
    fn minimal_config_uses_defaults() {
        let cfg = Config::from_toml_str(MINIMAL).expect("minimal config should parse");
        assert_eq!(cfg.total_steps, 1000);
        assert_eq!(cfg.recalibration_interval, 100);
        assert_eq!(cfg.shift_interval, 200);
        assert_eq!(cfg.population_size, 50);
        assert_eq!(cfg.seed, Some(42));
        assert_eq!(cfg.agents, AgentParams::default());
        assert_eq!(cfg.analysis, AnalysisParams::default());
    }

    #[test]
    fn partial_tables_keep_remaining_defaults() {
        let contents = format!("{MINIMAL}\n[steering]\nmax_penalty = 0.5\n");
        let cfg = Config::from_toml_str(&contents).expect("config should parse");
        assert_eq!(cfg.steering.max_penalty, 0.5);
        assert_eq!(
            cfg.steering.penalty_step,
            SteeringParams::default().penalty_step
        );
    }

    #[test]
    fn seed_is_optional() {
        let contents = MINIMAL.replace("seed = 42\n", "");
        let cfg = Config::from_toml_str(&contents).expect("config should parse");
        assert_eq!(cfg.seed, None);
    }

    #[test]
    fn rejects_invalid_core_options() {
        assert!(Config::new(1000, 100, 200, 0, Some(1)).is_err());
        assert!(Config::new(0, 100, 200, 50, Some(1)).is_err());
        assert!(Config::new(1000, 0, 200, 50, Some(1)).is_err());
        assert!(Config::new(1000, 100, 0, 50, Some(1)).is_err());
        assert!(Config::new(1000, 100, 200, 50, Some(1)).is_ok());
    }

    #[test]
    fn rejects_negative_steps() {
        let contents = MINIMAL.replace("total_steps = 1000", "total_steps = -5");
        assert!(Config::from_toml_str(&contents).is_err());
    }

    #[test]
    fn rejects_unknown_keys() {
        let contents = format!("{MINIMAL}\nsteps_per_save = 10\n");
        assert!(Config::from_toml_str(&contents).is_err());
    }

    #[test]
    fn rejects_inverted_payoff_bounds() {
        let contents = format!("{MINIMAL}\n[market]\npayoff_min = 1.5\npayoff_max = 1.0\n");
        let error = Config::from_toml_str(&contents).unwrap_err();
        assert!(format!("{error:#}").contains("minimum payoff"));
    }

    #[test]
    fn error_names_the_invalid_option() {
        let error = Config::new(1000, 100, 200, 0, None).unwrap_err();
        assert!(format!("{error:#}").contains("invalid population size"));
    }
}
