use crate::config::MarketParams;
use crate::model::Style;
use serde::{Deserialize, Serialize};

/// Incentive landscape faced by the agents.
///
/// The effective payoff of a style is its base payoff (set by the market)
/// minus its penalty (set by steering).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Incentives {
    base: [f64; 2],
    penalty: [f64; 2],
    era: Option<Style>,
}

impl Incentives {
    pub fn new(params: &MarketParams) -> Self {
        Self {
            base: [params.neutral_payoff, params.signaling_payoff],
            penalty: [0.0; 2],
            era: None,
        }
    }

    /// Effective payoff per step of using `style`.
    pub fn payoff(&self, style: Style) -> f64 {
        self.base(style) - self.penalty(style)
    }

    pub fn base(&self, style: Style) -> f64 {
        self.base[style.index()]
    }

    pub fn penalty(&self, style: Style) -> f64 {
        self.penalty[style.index()]
    }

    /// Style favored by the last market shift.
    pub fn era(&self) -> Option<Style> {
        self.era
    }

    pub fn penalties(&self) -> [f64; 2] {
        self.penalty
    }

    pub(crate) fn set_base(&mut self, style: Style, val: f64) {
        self.base[style.index()] = val;
    }

    pub(crate) fn set_penalty(&mut self, style: Style, val: f64) {
        self.penalty[style.index()] = val;
    }

    pub(crate) fn set_era(&mut self, era: Style) {
        self.era = Some(era);
    }
}
