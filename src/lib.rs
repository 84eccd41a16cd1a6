//! Commute travel-time prediction and route optimization.
//!
//! [`estimation::PredictionEngine`] turns historical observations from a
//! [`provider::TrafficDataProvider`] into per-route estimates;
//! [`optimizer::RouteOptimizer`] ranks routes and departure times on top of it.

pub mod analytics;
pub mod clock;
pub mod config;
pub mod domain;
pub mod error;
pub mod estimation;
pub mod optimizer;
pub mod provider;
pub mod results;
