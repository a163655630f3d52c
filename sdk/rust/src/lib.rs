//! Client SDK for the timezone router HTTP API.

pub mod client;

pub use client::{ApiError, ClientError, HealthResponse, TimeClient, TimeResponse};
