pub mod fairness;
pub mod insights;
pub mod orchestrator;
pub mod random;
pub mod session;
pub mod strategies;
