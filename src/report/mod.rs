//! Report module - summaries and exports

pub mod export;
pub mod summary;

pub use export::*;
pub use summary::*;
