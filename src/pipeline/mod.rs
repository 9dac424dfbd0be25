//! Pipeline module - the two-layer validation and scoring stages

pub mod analyze;
pub mod duplicates;
pub mod isolation;
pub mod loader;
pub mod outlier;
pub mod record;
pub mod rules;
pub mod schema;

pub use analyze::*;
pub use duplicates::*;
pub use isolation::*;
pub use loader::*;
pub use outlier::*;
pub use record::*;
pub use rules::*;
pub use schema::*;
