pub use entity::{provider, provider_profiles, users, Id};

pub mod error;
pub mod provider_profile;
pub mod user;
