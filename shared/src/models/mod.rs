//! Domain models for the Farm Advisor platform

mod crop;
mod user;
mod weather;

pub use crop::*;
pub use user::*;
pub use weather::*;
