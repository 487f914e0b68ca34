//! Local (reqwest) implementations for `pagespeed-core`.

pub mod client;
pub mod config;

pub use client::PsiClient;
pub use config::{resolve_api_key, ApiKey, ClientSettings, KeySource};
