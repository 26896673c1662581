//! Client-side session and token-refresh core for the job board.
//!
//! SYSTEM CONTEXT
//! ==============
//! Every outbound API call flows through [`net::client::ApiClient`]. A 401 on
//! a first attempt hands the request to [`net::refresh::RefreshCoordinator`],
//! which runs at most one refresh at a time and replays queued requests once
//! it settles. [`state::session::SessionStore`] is the single source of truth
//! for the access token and identity, and [`guard::RouteGuard`] decides what
//! navigation happens when a session appears or disappears.
//!
//! [`app::JobBoardClient`] wires the pieces together once per process.

pub mod app;
pub mod config;
pub mod error;
pub mod guard;
pub mod net;
pub mod services;
pub mod state;

pub use app::JobBoardClient;
pub use config::ClientConfig;
pub use error::{ApiError, ConfigError};
