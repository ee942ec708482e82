//! This module re-exports various items from the `entity_api` crate.
//!
//! The purpose of this re-export is to ensure that consumers of the `domain` crate do not need to
//! directly depend on the `entity_api` crate. By re-exporting these items, we provide a clear and
//! consistent interface for working with users and provider profiles within the domain layer,
//! while the underlying implementation details remain in the `entity_api` crate.
pub use entity_api::{provider, provider_profiles, users, Id};

pub use entity_api::user::{AuthSession, Backend, Credentials};

pub mod error;
pub mod flow;
pub mod flow_session;
pub mod notice;
pub mod profile_data;
pub mod provider_registry;
pub mod setup_form;
pub mod store;
pub mod username;
pub mod visitor;

#[cfg(test)]
pub(crate) mod test_support;
