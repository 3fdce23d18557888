//! Business logic services for the Weatherboy platform

pub mod scoring;

pub use scoring::ScoringEngine;
