//! # Whisperwall
//!
//! A small secret-sharing web application. Visitors can browse an anonymous
//! wall of secrets; anyone who registers (email + password) or signs in with
//! Google can put one secret of their own on the wall.
//!
//! ## Authentication
//!
//! Two flows, both ending in the same cookie session:
//!
//! - **Local**: passwords are stored as Argon2id PHC strings; registration
//!   logs the user straight in, no second round-trip.
//! - **Google OAuth 2.0**: the callback exchanges the authorization code for
//!   the provider's stable subject identifier and finds-or-creates a user
//!   keyed on it. Only the subject is stored, never tokens.
//!
//! ## Sessions
//!
//! The browser holds an opaque random token in an `HttpOnly` cookie; the
//! database stores only its SHA-256 hash next to the user id. Every request
//! re-fetches the user by id, so a session never serves stale user data.

pub mod cli;
pub mod whisperwall;
