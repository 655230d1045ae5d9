//! Conversion session: drives chunks through synthesis, download and
//! combining, and reports what was delivered.

mod runner;
pub mod types;

pub use runner::Session;
pub use types::{Deliverable, SessionEvent, SessionOptions, SessionOutcome, SessionReport, Stage};
