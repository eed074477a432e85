//! OAuth token exchange adapters.

mod http_exchanger;

pub use http_exchanger::{HttpTokenExchanger, OAuthEndpoint};
