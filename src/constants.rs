//! Centralized constants used across the bank loader, index, and sampler.

/// Constants bounding the qbank record format.
pub mod bank {
    /// Marker opening a question record.
    pub const OPEN_MARK: &str = "<q";
    /// Marker closing a question record.
    pub const CLOSE_MARK: &str = "q>";
    /// Max number of question records accepted from one bank file.
    pub const MAX_QUESTIONS: usize = 1024;
    /// Max byte length of a single question record.
    pub const MAX_QUESTION_LEN: usize = 512;
}

/// Constants governing sampler retry behavior.
pub mod sampler {
    /// Max random draws attempted per emission slot before falling back to
    /// a deterministic scan for the first unused index.
    pub const DRAW_RETRY_LIMIT: usize = 65_535;
}
