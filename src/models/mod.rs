pub mod ai;
pub mod calendar;
pub mod journal;
pub mod lenient;
pub mod planning;
pub mod settings;
pub mod task;
