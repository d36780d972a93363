//! Authentication extractors.
//!
//! - [`auth::RequireAdmin`] -- Admin bearer-token gate (open when no token is configured).
//! - [`auth::AuthAgent`] -- Resolves the calling agent from `X-Agent-Token`.
//! - [`auth::Caller`] -- Admin or agent, for endpoints both may call.

pub mod auth;
