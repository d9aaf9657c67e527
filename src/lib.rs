#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::multiple_crate_versions, clippy::module_name_repetitions)]

pub mod app;
pub mod config;
pub mod error;
pub mod intake;
pub mod llm;
pub mod logging;
pub mod models;
pub mod recipe;
pub mod routes;
pub mod submission;

pub use app::build_app;
pub use models::AppState;
