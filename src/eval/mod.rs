pub mod evaluator;
pub mod metrics;

pub use evaluator::{CursorState, Evaluator, TestBatches};
pub use metrics::Evaluation;
