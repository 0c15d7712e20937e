//! `gridgroup-core` — coordinate vocabulary shared by the grouping engine.
//!
//! Two coordinate spaces meet here:
//! - Index space: stable logical identity of a row/column
//! - Position space: current visible ordinal, changes with hide/show/reorder
//!
//! The engine never owns the mapping between them. It queries an
//! [`IndexPositionConverter`] and issues hide/show/reorder requests to it.

pub mod axis_view;
pub mod converter;
pub mod range;

pub use axis_view::AxisView;
pub use converter::{IndexPositionConverter, ReorderRejected};
pub use range::{Axis, PositionRange};
