//! Job-board endpoint wrappers over the authenticated client.
//!
//! ARCHITECTURE
//! ============
//! Each function builds one request and sends it through `ApiClient`, so
//! token attachment and 401 recovery apply uniformly. Mutations fetch a CSRF
//! token first. No business validation happens here.

pub mod bookmarks;
pub mod jobs;
