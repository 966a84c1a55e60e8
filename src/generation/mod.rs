// Generation pipeline
// Author: kelexine (https://github.com/kelexine)

mod orchestrator;
pub mod output;

pub use orchestrator::{Orchestrator, OrchestratorSettings};
