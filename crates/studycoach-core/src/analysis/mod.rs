//! Heuristic text analysis. Normalized text is segmented and its terms ranked, and
//! summaries and quizzes are built from both.
//!
//! Everything here is synchronous and allocation-bounded by the input text. The only
//! nondeterminism is the caller-supplied RNG used by [`mcq`].

pub mod assemble;
pub mod cloze;
pub mod mcq;
pub mod segment;
pub mod summarize;
pub mod terms;
pub mod textprep;
