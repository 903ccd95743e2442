pub mod commands;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

pub use commands::{AppState, CommandError, CommandResult};
pub use error::{AppError, AppResult};
