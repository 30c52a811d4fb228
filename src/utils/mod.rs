//! Small shared helpers

pub mod comparison;

pub use comparison::{first_min_index, safe_float_cmp, sorted_values};
