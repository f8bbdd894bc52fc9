//! Core data structures for sfmkit
//!
//! This crate provides the in-memory model of a sparse reconstruction
//! (cameras, posed images, 3D points) together with the pose conversion
//! and point sampling helpers that feed it.

pub mod camera;
pub mod error;
pub mod image;
pub mod point;
pub mod pose;
pub mod sample;

pub use camera::*;
pub use error::*;
pub use image::*;
pub use point::*;
pub use pose::*;
pub use sample::*;

/// Re-export commonly used types from nalgebra
pub use nalgebra::{Matrix4, Point2, Point3, Rotation3, UnitQuaternion, Vector3};
