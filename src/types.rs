/// Raw text of one question record, copied verbatim from the bank file.
/// Example: ` define foo `
pub type QuestionText = String;
/// Whitespace-stripped, lower-cased byte form of a question, used for
/// insensitive equality.
/// Example: `definefoo`
pub type NormalizedKey = Vec<u8>;
/// Index of a bucket inside a hash table.
pub type BucketIndex = usize;
/// Position of an emission within one sampling run (0-based).
pub type EmissionOrdinal = usize;
