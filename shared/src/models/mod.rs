//! Domain models for the Weatherboy flood-risk platform

mod audit;
mod bulletin;
mod location;
mod nowcast;
mod radar;
mod risk;
mod river_basin;
mod station;
mod warning;

pub use audit::*;
pub use bulletin::*;
pub use location::*;
pub use nowcast::*;
pub use radar::*;
pub use risk::*;
pub use river_basin::*;
pub use station::*;
pub use warning::*;
