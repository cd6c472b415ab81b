//! # multilat-core
//!
//! Core types shared by every role of the multilateration sensor network.
//!
//! This crate provides:
//! - The control-plane wire schema ([`wire`]) with its contractual
//!   numeric status codes
//! - The data-plane `GetDistance` token and distance framing
//! - [`MultilatError`], the error taxonomy shared across roles
//! - [`Point3`], the 3D geometry used by sensors, the solver, and the
//!   trajectory

pub mod error;
pub mod geometry;
pub mod wire;

pub use error::{MultilatError, Result};
pub use geometry::Point3;
