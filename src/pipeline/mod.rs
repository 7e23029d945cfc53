//! Run orchestration: state transitions and the query machine

pub mod query;
pub mod state;

pub use query::QueryPipeline;
pub use state::{apply, Event};
