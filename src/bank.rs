//! Loader for the qbank flat-file record format.

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::constants::bank::{CLOSE_MARK, MAX_QUESTION_LEN, MAX_QUESTIONS, OPEN_MARK};
use crate::errors::QbankError;
use crate::types::QuestionText;

/// Extract question records from a qbank-format buffer.
///
/// Records are delimited `<q ... q>`; the body is kept verbatim, embedded
/// newlines included. Text between records is ignored. Unterminated
/// records, records longer than [`MAX_QUESTION_LEN`], and banks holding
/// more than [`MAX_QUESTIONS`] records are configuration errors.
pub fn parse_bank(input: &str) -> Result<Vec<QuestionText>, QbankError> {
    let mut questions = Vec::new();
    let mut rest = input;
    while let Some(open) = rest.find(OPEN_MARK) {
        let after = &rest[open + OPEN_MARK.len()..];
        let Some(close) = after.find(CLOSE_MARK) else {
            return Err(QbankError::Configuration(format!(
                "unterminated question record after {} complete record(s)",
                questions.len()
            )));
        };
        let body = &after[..close];
        if body.len() > MAX_QUESTION_LEN {
            return Err(QbankError::Configuration(format!(
                "question record {} is {} bytes, limit is {MAX_QUESTION_LEN}",
                questions.len(),
                body.len()
            )));
        }
        if questions.len() == MAX_QUESTIONS {
            return Err(QbankError::Configuration(format!(
                "bank holds more than {MAX_QUESTIONS} question records"
            )));
        }
        questions.push(body.to_string());
        rest = &after[close + CLOSE_MARK.len()..];
    }
    Ok(questions)
}

/// Read and parse a qbank-format file.
pub fn load_bank(path: &Path) -> Result<Vec<QuestionText>, QbankError> {
    let contents = fs::read_to_string(path)?;
    let questions = parse_bank(&contents)?;
    debug!(count = questions.len(), path = %path.display(), "loaded question bank");
    Ok(questions)
}
