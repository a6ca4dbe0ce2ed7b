pub mod types;
pub mod engine;

pub use types::*;
pub use engine::RuleEngine;
