//! HTTP request handlers.
//!
//! Handlers assume the middleware pipeline has already run: payloads
//! arriving here passed validation, and gated routes carry a verified
//! [`crate::middleware::AuthContext`]. Every handler responds with the
//! uniform envelope from [`crate::response`].

pub mod admin;
pub mod developers;
pub mod games;
pub mod health;
