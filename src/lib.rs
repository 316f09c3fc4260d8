pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod models;
pub mod notes;
pub mod service;
pub mod store;

pub use db::Database;
pub use error::{CoreError, CoreResult};
