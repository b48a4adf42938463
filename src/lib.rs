//! Library exports for the FakeAirbnb booking service
//!
//! This module exposes internal components for testing and potential library usage.

pub mod availability;
pub mod config;
pub mod database;
pub mod error;
pub mod extract;
pub mod filter;
pub mod handler;
pub mod middleware;
pub mod model;
pub mod normalize;
pub mod payment;
pub mod route;
pub mod search;
pub mod seed;
pub mod session;
