pub mod admin;
pub mod app_version;
pub mod auth;
pub mod notifications;
pub mod prefetch;
