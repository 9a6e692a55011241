//! Integration tests for the Triage API.
//!
//! Every test drives the full router built by [`api::create_router`] over
//! fresh in-memory stores.

mod common;
mod dashboard_tests;
mod health_tests;
mod statistics_tests;
mod telemetry_tests;
