//! flagcount-client: access to the remote feature-flag management API.
//!
//! [`FlagApi`] is the contract the scraper depends on; [`HttpFlagApi`]
//! implements it over authenticated HTTPS with reqwest.
//!
//! # Endpoints
//!
//! | Operation | Path |
//! |---|---|
//! | configs | `GET /v1/products/{product_id}/configs` |
//! | environments | `GET /v1/products/{product_id}/environments` |
//! | feature flags | `GET /v1/configs/{config_id}/settings` |
//! | stale flags | `GET /v1/products/{product_id}/staleflags` |

pub mod api;
pub mod error;
pub mod http;

pub use api::FlagApi;
pub use error::{FetchError, FetchResult};
pub use http::HttpFlagApi;
