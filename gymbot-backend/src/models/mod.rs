pub mod exercise;
pub mod query;

pub use exercise::{ExerciseDraft, ExerciseRecord, Weights};
pub use query::QuerySpec;
