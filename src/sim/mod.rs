pub mod scenario;
pub mod simulator;

pub use scenario::Scenario;
pub use simulator::{RunStats, Simulator};
