//! HTTP request handlers.
//!
//! This module contains the endpoint handlers for the serving backend.

pub mod health;
pub mod ws;
