//! HTTP provider clients.

mod client;
mod factory;

pub use client::{ProviderHttpClient, ProviderHttpError};
pub use factory::HttpClientFactory;
