pub mod id;
pub mod limits;
pub mod similarity;
pub mod time_serde;
pub mod trace;

mod error;

pub use error::{Error, Result};
pub use trace::{Outcome, Trace, TraceMetadata};
