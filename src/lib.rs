pub mod api;
pub mod checkpoint;
pub mod config;
pub mod core_types;
pub mod error;
pub mod evaluation;
pub mod optimizer;
pub mod simulation;
