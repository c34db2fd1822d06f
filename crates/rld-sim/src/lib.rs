pub mod simulation;

mod buffers;
mod model;
mod passes;

pub use model::Model;
pub use simulation::{SimConfig, Simulation, SweepParams};
