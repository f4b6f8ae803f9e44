//! Provider classification.
//!
//! `database` models and loads the JSON provider database; `matcher`
//! compiles it into an immutable matching structure; `signals` derives the
//! per-target inputs; `engine` produces the verdicts.

mod database;
mod engine;
mod matcher;
mod signals;

pub use database::{CategoryTables, PatternTable, ProviderDatabase};
pub use engine::{address_count_heuristic, classify, ClassificationResult};
pub use matcher::{CompiledCategory, CompiledProviderDb};
pub use signals::ProviderSignalSet;
