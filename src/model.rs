//! Simulation data types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Communication style of an agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Style {
    Neutral,
    Signaling,
}

impl Style {
    pub const ALL: [Style; 2] = [Style::Neutral, Style::Signaling];

    /// Position of the style in per-style arrays.
    pub fn index(self) -> usize {
        match self {
            Style::Neutral => 0,
            Style::Signaling => 1,
        }
    }

    pub fn other(self) -> Style {
        match self {
            Style::Neutral => Style::Signaling,
            Style::Signaling => Style::Neutral,
        }
    }
}

impl fmt::Display for Style {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Style::Neutral => write!(f, "neutral"),
            Style::Signaling => write!(f, "signaling"),
        }
    }
}

/// Agent of the simulation.
///
/// Each agent keeps its identifier for the whole run, a current style,
/// and the payoff it has accumulated so far.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    id: usize,
    style: Style,
    payoff: f64,
}

impl Agent {
    /// Create a new agent with a given style and no payoff.
    pub fn new(id: usize, style: Style) -> Self {
        Self {
            id,
            style,
            payoff: 0.0,
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn style(&self) -> Style {
        self.style
    }

    pub fn payoff(&self) -> f64 {
        self.payoff
    }

    pub(crate) fn set_style(&mut self, style: Style) {
        self.style = style;
    }

    pub(crate) fn credit(&mut self, amount: f64) {
        self.payoff += amount;
    }

    pub(crate) fn reset_payoff(&mut self) {
        self.payoff = 0.0;
    }
}

/// Number of agents using each style at a given step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleDistribution {
    counts: [usize; 2],
}

impl StyleDistribution {
    pub fn from_agents(agents: &[Agent]) -> Self {
        let mut counts = [0; 2];
        for agt in agents {
            counts[agt.style().index()] += 1;
        }
        Self { counts }
    }

    pub fn from_counts(neutral: usize, signaling: usize) -> Self {
        Self {
            counts: [neutral, signaling],
        }
    }

    pub fn count(&self, style: Style) -> usize {
        self.counts[style.index()]
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Fraction of agents using `style` (zero for an empty distribution).
    pub fn fraction(&self, style: Style) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        self.count(style) as f64 / total as f64
    }

    /// Style used by strictly more agents than any other.
    ///
    /// Returns `None` on a tie or for an empty distribution.
    pub fn dominant(&self) -> Option<Style> {
        let neutral = self.count(Style::Neutral);
        let signaling = self.count(Style::Signaling);
        match neutral.cmp(&signaling) {
            std::cmp::Ordering::Greater => Some(Style::Neutral),
            std::cmp::Ordering::Less => Some(Style::Signaling),
            std::cmp::Ordering::Equal => None,
        }
    }

    /// Shannon entropy of the distribution in bits.
    pub fn diversity(&self) -> f64 {
        Style::ALL
            .iter()
            .map(|&style| self.fraction(style))
            .filter(|&p| p > 0.0)
            .map(|p| -p * p.log2())
            .sum()
    }
}
