//! Token-level text diffing for live document updates.
//!
//! Documents are streamed as whole-text replacements. To show the reader what
//! changed, the client splits both versions into tokens (word runs and
//! whitespace runs) and computes an edit script between them.
//!
//! ```text
//!   old text ──tokenize──▶ [hello][ ][world]
//!                                 │
//!                          DiffAlgorithm (LCS)
//!                                 │
//!   new text ──tokenize──▶ [hello][ ][brave][ ][world]
//!
//!   script: =hello = ␠ +brave +␠ =world
//! ```
//!
//! # Guarantees
//!
//! - `tokenize(s).concat() == s` for every input
//! - the `Equal`+`Delete` tokens of a script spell the old text, the
//!   `Equal`+`Insert` tokens spell the new text
//! - diffing a text against itself yields only `Equal` ops
//!
//! Any [`DiffAlgorithm`] must uphold the reconstruction guarantee; which
//! minimal (or near-minimal) script it picks is its own business.

mod lcs;
mod script;
mod tokenize;

pub use lcs::LcsDiff;
pub use script::{EditOp, EditScript, OpKind};
pub use tokenize::{Token, tokenize};

/// Computes an edit script between two token sequences.
///
/// Implementations are swapped in where the quadratic LCS table is too
/// expensive for the documents at hand.
pub trait DiffAlgorithm: Send + Sync {
    /// Diff already-tokenized inputs.
    fn diff_tokens(&self, old: &[Token], new: &[Token]) -> EditScript;

    /// Tokenize both texts and diff them.
    fn diff(&self, old_text: &str, new_text: &str) -> EditScript {
        self.diff_tokens(&tokenize(old_text), &tokenize(new_text))
    }
}

/// Diff two texts with the default LCS engine.
pub fn compute_diff(old_text: &str, new_text: &str) -> EditScript {
    LcsDiff.diff(old_text, new_text)
}
