//! Learned per-game objective functions and input motifs.
//!
//! An objective is an ordered list of RAM locations learned offline from a
//! human playthrough; memory counts as progress when it increases
//! lexicographically at those locations. A motif is a short input sequence
//! harvested from the same playthrough, replayed by the search as a unit.
//!
//! Both are loaded from plain text files produced by the learning tools, one
//! weighted entry per line.

#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

pub use error::*;
pub use motifs::Motifs;
pub use objectives::WeightedObjectives;

mod error;
mod motifs;
mod objectives;
