//! Data models returned by the solar facility API.
//!
//! - `Facility`, `FacilitySummary`: a monitored installation
//! - `SolarReading`: one row of uploaded solar data
//! - `AuthPayload`: result of `login`/`signup`

pub mod facility;
pub mod user;

pub use facility::{Facility, FacilitySummary, SolarReading};
pub use user::AuthPayload;
