//! Shared types and domain logic for the Farm Advisor platform
//!
//! This crate contains the models, the crop suitability scorer, the
//! recommendation ranking, the season-ahead rotation and yield predictions
//! and the forecast hazard checks. It performs no I/O
//! so it can be used by the backend and compiled to WASM for the browser.

pub mod hazards;
pub mod models;
pub mod prediction;
pub mod recommend;
pub mod scoring;
pub mod types;
pub mod validation;

pub use hazards::*;
pub use models::*;
pub use prediction::*;
pub use recommend::*;
pub use scoring::*;
pub use types::*;
pub use validation::*;
