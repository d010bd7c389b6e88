//! # axewatch-types
//!
//! Core types for BitAxe telemetry. This crate defines the values a device
//! reports on its `/api/system/info` endpoint, the point-in-time
//! [`Snapshot`] that holds them, and the display names used when
//! presenting them.
//!
//! ## Features
//!
//! - `serde`: JSON serialization of snapshots and metric values via serde
//!
//! ## Example
//!
//! ```rust
//! use axewatch_types::{label, MetricValue, Snapshot};
//!
//! let snapshot = Snapshot::builder()
//!     .metric("power", 12.3)
//!     .metric("sharesAccepted", 1042u64)
//!     .build();
//!
//! assert_eq!(snapshot.get("power"), Some(&MetricValue::Float(12.3)));
//! assert_eq!(label("sharesAccepted"), "Shares Accepted");
//! ```

mod names;
mod snapshot;
mod value;

pub use names::*;
pub use snapshot::*;
pub use value::*;
