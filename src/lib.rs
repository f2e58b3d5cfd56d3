//! Repeated signaling game with adaptive incentive steering.
//!
//! A fixed population of agents chooses between a neutral and a signaling
//! communication style. Every step the fraction of signaling agents (the
//! Nash distance) is recorded; a steering controller periodically penalizes
//! the dominant style, and market shifts periodically redraw the payoffs.
//! See [`engine::Engine`] for the entry point.

pub mod config;
pub mod engine;
pub mod evolution;
pub mod incentives;
pub mod market;
pub mod metric;
pub mod model;
pub mod pool;
pub mod stats;
pub mod steering;
