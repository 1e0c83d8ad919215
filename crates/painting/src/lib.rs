//! Knobpaint painting core - surface picking, stamp commands and layer history
//!
//! This crate provides the CPU side of painting onto a mesh:
//! - [`bvh`] - Triangle BVH with bounded traversal
//! - [`raycast`] - Ray primitives and the brute-force reference scan
//! - [`camera`] - Orbit view state and orthographic camera basis
//! - [`picker`] - Screen-to-UV picking with planar fallback
//! - [`brush`] - Brush settings and stamp weight profiles
//! - [`stroke`] - Stroke engine producing [`types::StampCommand`]s
//! - [`history`] - Committed strokes, revisions and layers
//! - [`document`] - JSON paint and view documents
//! - [`pipeline`] - Complete painting session

pub mod brush;
pub mod bvh;
pub mod camera;
pub mod constants;
pub mod document;
pub mod history;
pub mod picker;
pub mod pipeline;
pub mod raycast;
pub mod stroke;
pub mod types;

pub use brush::*;
pub use bvh::*;
pub use camera::*;
pub use constants::*;
pub use document::*;
pub use history::*;
pub use picker::*;
pub use pipeline::*;
pub use raycast::*;
pub use stroke::*;
pub use types::*;
