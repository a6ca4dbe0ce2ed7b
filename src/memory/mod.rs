pub mod types;
pub mod tokenizer;
pub mod persist;
pub mod store;
pub mod snapshot;

pub use types::*;
pub use tokenizer::tokenize;
pub use store::FrequencyStore;
pub use snapshot::Snapshot;
