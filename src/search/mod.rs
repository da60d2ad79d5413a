pub mod orchestrator;

pub use orchestrator::SearchOrchestrator;
