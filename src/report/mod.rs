//! News digests.

mod generator;

pub use generator::*;
