//! Selection translation for Tessera datasets.
//!
//! Clients describe the part of a dataset they want to read or write with a
//! small grammar (`[0:10:2, 3, ...]`), with explicit hyperslab arrays, or with
//! a list of points. This crate parses those forms, checks them against the
//! dataset's current shape, and produces descriptors the container uses for
//! bounded I/O. Element order is always row-major.
//!
//! # Key Types
//!
//! - [`SelectionSpec`] / [`DimSpec`] -- parsed but unbound grammar
//! - [`RegionSelection`] -- per-dimension `(start, stop, step)` bound to a shape
//! - [`PointSelection`] -- explicit coordinate list bound to a shape
//! - [`ResizePlan`] -- validated shape change for `extend`
//!
//! # Grammar
//!
//! ```text
//! selection := "" | "ALL" | "[" dims "]" | dims
//! dims      := dim ("," dim)* ("," "...")? | "..."
//! dim       := INT | [INT] ":" [INT] [":" [INT]]
//! ```
//!
//! A point (`INT`) drops its dimension from the result shape. Steps must be
//! positive. Bounds are checked against the current shape, never the maximum
//! shape.

pub mod error;
pub mod points;
pub mod region;
pub mod resize;
pub mod spec;

pub use error::{SelectError, SelectResult};
pub use points::PointSelection;
pub use region::{parse, Coordinates, DimSelection, RegionSelection};
pub use resize::{plan_resize, ResizeMode, ResizePlan};
pub use spec::{DimSpec, SelectionSpec};
