//! Swing Trade Simulator
//!
//! Evaluates a swing trade exit plan (entry price, take-profit, stop-loss,
//! exchange fee and an optional gradual exit schedule) before any capital is
//! committed: single exit at TP, full gradual exit, partial exits stopped out
//! on the remainder, and tick-by-tick walks over price paths.
//!
//! ```
//! use swing_simulator::{SimulationConfig, StrategySimulator};
//!
//! let run = SimulationConfig::default();
//! let sim = StrategySimulator::new(run.strategy, run.quantity).unwrap();
//! let single = sim.simulate_single_sell();
//! assert!(single.total_net_profit > 0.0);
//! ```

pub mod config;
pub mod data;
pub mod interactive;
pub mod payload;
pub mod report;
pub mod simulator;
pub mod types;
pub mod walker;

pub use config::{GradualStage, SimulationConfig, StrategyConfig};
pub use payload::{build_create_request, CreateStrategyRequest};
pub use simulator::StrategySimulator;
pub use types::*;
