#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

/// Loader for the `<q ... q>` question record format.
pub mod bank;
/// Singly-linked chain nodes with cursor-based removal.
pub mod chain;
/// Command-line flow shared by the `qbank` binary and tests.
pub mod cli;
/// Centralized constants for the bank format and the sampler.
pub mod constants;
/// Output formatting and the two optional emission sinks.
pub mod emit;
/// Normalized-key membership index over question text.
pub mod index;
/// Derived measurements over finished sampling runs.
pub mod metrics;
/// Unique random selection with a bounded duplicate budget.
pub mod sampler;
/// Separate-chaining hash table over byte keys.
pub mod table;
/// Shared type aliases.
pub mod types;

mod errors;

pub use bank::{load_bank, parse_bank};
pub use chain::{Chain, ChainCursor, ChainNode};
pub use emit::EmitSinks;
pub use errors::QbankError;
pub use index::{SeenIndex, normalize_key};
pub use sampler::{
    DeterministicRng, RunStats, SampleRequest, Sampler, check_capacity, max_offerable,
    reference_overlap,
};
pub use table::{HashFn, HashTable, TableCursor, fold_hash};
pub use types::{BucketIndex, EmissionOrdinal, NormalizedKey, QuestionText};
