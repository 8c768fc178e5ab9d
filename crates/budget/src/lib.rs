//! Turn and wall-clock budget enforcement (spec component C5).

mod tracker;

pub use tracker::BudgetTracker;
