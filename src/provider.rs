//! Provider-facing descriptors for the built-in OAuth 2.0 backend.
//!
//! `descriptor` exposes validated metadata (`ProviderDescriptor`) covering HTTPS-only token and
//! user-info endpoints, client authentication preferences, and provider quirks (user data
//! field mapping, how the access token reaches the user-info endpoint).

pub mod descriptor;

pub use descriptor::*;
