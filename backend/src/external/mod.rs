//! External API integrations

pub mod geocoding;
pub mod notifier;
pub mod retry;
pub mod soil;
pub mod weather;

pub use geocoding::GeocodingClient;
pub use notifier::{AlertNotice, Notifier};
pub use soil::{SoilClient, SoilProfile};
pub use weather::WeatherClient;
