pub mod llm;
pub mod plan_simulator;
pub mod query_analyzer;

pub use plan_simulator::{PlanSimulator, SimulationOutcome};
pub use query_analyzer::QueryAnalyzer;
