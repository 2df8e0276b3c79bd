//! HTTP route handlers

pub mod anomalies;
pub mod predictions;
