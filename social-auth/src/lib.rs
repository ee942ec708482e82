//! # social-auth
//!
//! OAuth 1.0a and 2.0 clients for the supported identity providers, plus the
//! signing helpers the web layer uses for cookies:
//! - `provider` / `providers`: one static descriptor per provider
//! - `client`: the token dance and authenticated API calls
//! - `oauth1`: HMAC-SHA1 request signing
//! - `signing`: timestamped HMAC-SHA256 signed values
//!
//! ## Usage
//!
//! ```rust,ignore
//! use social_auth::{AppCredentials, Client, Descriptor, ProviderKind};
//!
//! let client = Client::new(
//!     Descriptor::for_kind(ProviderKind::GitHub, false),
//!     credentials,
//!     vec![],
//!     http,
//! );
//! ```

pub mod client;
pub mod error;
pub mod http;
pub mod oauth1;
pub mod provider;
pub mod providers;
pub mod response;
pub mod signing;
pub mod state;

pub use client::{
    AccessToken, ApiResponse, AppCredentials, AuthorizationParams, Client, ExchangeParams,
    OAuthClient, RequestToken, TokenResponse, TokenStatus,
};
pub use error::{Error, ErrorKind};
pub use provider::{Descriptor, OAuthVersion, ProviderKind, UserData};
pub use signing::Signer;
