//! Core data models for boundary conversion.

pub mod boundary;

pub use boundary::{Boundary, Bounds, QuantizedRing, Ring, ShapeType, SourceRecord};
