pub mod client;
pub mod types;

mod locations;
mod party_themes;
mod ships;
mod talent;
mod trips;
mod updates;
mod users;

pub use client::{ApiClient, RequestOptions};
pub use types::ApiError;
