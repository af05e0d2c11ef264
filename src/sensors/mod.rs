//! Sensor module - inbound measurement boundary and demo sources

mod traits;
mod simulator;
mod replay;

pub use traits::*;
pub use simulator::{Scenario, ScenarioSimulator};
pub use replay::ReplaySource;

pub use crate::analysis::{FaceSample, HeadPoint, PoseSample};
