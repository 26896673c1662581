//! Networking modules for the authenticated API client.
//!
//! SYSTEM CONTEXT
//! ==============
//! `transport` is the raw HTTP seam, `csrf` fetches anti-forgery tokens,
//! `refresh` owns the refresh call and the single-flight coordinator, and
//! `client` is the interceptor pipeline every API call goes through.

pub mod client;
pub mod csrf;
pub mod refresh;
pub mod transport;

#[cfg(test)]
pub(crate) mod mock;
