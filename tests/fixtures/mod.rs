//! Test fixtures for jeepney-router.
//!
//! Provides real Cebu City locations and in-memory provider fakes.

#![allow(dead_code)]

pub mod cebu_locations;
pub mod fakes;

pub use cebu_locations::*;
pub use fakes::*;
