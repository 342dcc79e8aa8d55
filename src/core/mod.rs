//! Leaf value types the scene graph is assembled from.
//!
//! - [`attribute`]: leveled discrete attributes, their ordered value tables,
//!   bounds, and history-biased resampling.
//! - [`slots`]: slot catalogs and the positional attribute (an active subset
//!   of candidate bounding boxes).

pub mod attribute;
pub mod slots;
