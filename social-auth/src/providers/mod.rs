//! One descriptor per supported provider.

pub mod facebook;
pub mod github;
pub mod linkedin;
pub mod moves;
pub mod paypal;
pub mod twitter;
