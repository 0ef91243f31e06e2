//! Rust client for Firebase HTTPS callable Cloud Functions.
//!
//! An app is initialized once with [`app::initialize_app`]; [`functions::get_functions`] then
//! hands out a cached [`functions::Functions`] client per app and region (or custom domain),
//! from which callable references are created and invoked.
//!
//! Optional Auth, App Check and Cloud Messaging tokens are supplied through
//! [`platform::token::AsyncTokenProvider`] implementations registered on the app.

pub mod app;
pub mod component;
pub mod functions;
pub mod logger;
pub mod platform;

#[cfg(test)]
pub mod test_support;
