//! geoscene Environment Abstraction Layer
//!
//! This crate holds the narrow contracts between the placement engine and
//! the subsystems it does not own:
//! - The camera-tracking engine (`TrackingSource`)
//! - The GPS/compass fusion component (`LocationSource`)
//!
//! # Core Concept: The Snapshot
//!
//! The engine never queries the sources mid-update. Once per tick the host
//! captures a [`ReferenceFrame`] from both sources and hands the immutable
//! snapshot to every node. A source that has nothing to report yet simply
//! yields `None`, and the engine defers work until the next tick.
//!
//! # Example
//!
//! ```ignore
//! use geoscene_env::{ReferenceFrame, StaticSource};
//!
//! let source = StaticSource::default();
//! let frame = ReferenceFrame::capture(&source, &source);
//! registry.update_all(&frame);
//! ```

mod context;
mod error;
mod frame;
mod static_impl;
mod types;

pub use context::{LocationSource, TrackingSource};
pub use error::EnvError;
pub use frame::{LocalPosition, ReferenceFrame};
pub use static_impl::StaticSource;
pub use types::{GeoCoordinate, NodeHandle};
