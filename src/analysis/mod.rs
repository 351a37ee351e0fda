//! News analysis.
//!
//! Text utilities (keywords, companies, sentiment, dates) and the
//! trend and spike analyzer built on top of them.

pub mod analyzer;
pub mod text;

pub use analyzer::*;
pub use text::*;
