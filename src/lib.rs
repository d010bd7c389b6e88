//! # axewatch
//!
//! A small host for the axewatch polling engine: it reads which BitAxe
//! miners to watch, registers one coordinator per device, and prints their
//! telemetry whenever it changes.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  axewatch (host)          settings ──▶ Registry ──▶ report   │
//! │                                          │                   │
//! │  axewatch-sdk             Coordinator ◀──┘ (one per device)  │
//! │                               │  in-flight guard, timer,     │
//! │                               │  RefreshState, MetricHandle  │
//! │  axewatch-adapters        Fetcher ── BitaxeAdapter (HTTP)    │
//! │  axewatch-types           Snapshot, MetricValue, labels      │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! - **[`settings`]**: device list and polling settings from file, environment
//!   and flags
//! - **[`report`]**: renders a coordinator's state as text lines or JSON
//!
//! ## Usage
//!
//! ```bash
//! # Watch one miner, refreshing every 30 seconds
//! axewatch --device 192.168.1.42
//!
//! # Named devices from a config file, print once and exit
//! axewatch --config axewatch.toml --once
//! ```

pub mod report;
pub mod settings;

pub use settings::{DeviceConfig, Settings};
