pub mod assemble;
pub mod extract;
pub mod orchestrator;
pub mod prompt;
pub mod sanitize;

pub use orchestrator::{GenerationSettings, generate_report};
