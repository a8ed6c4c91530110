//! # faultline
//!
//! The Faultline service: configuration, logging bootstrap and the ingestion
//! pipeline that ties error grouping to alerting.
//!
//! ## Flow
//!
//! 1. An incoming [`NewErrorEvent`](faultline_events::NewErrorEvent) is
//!    validated and fingerprinted.
//! 2. It is folded into its group and stored.
//! 3. Alert evaluation for the stored event runs on a background task; the
//!    caller gets the stored event back without waiting for it.
//!
//! ## Example
//!
//! ```rust
//! use faultline::{Pipeline, ServiceConfig};
//! use faultline_alerts::Transports;
//! use faultline_events::{ErrorType, NewErrorEvent, Severity};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> faultline::Result<()> {
//! let pipeline = Pipeline::new(&ServiceConfig::default(), Transports::new())?;
//! let stored = pipeline.ingest(NewErrorEvent::new(
//!     "payment 8812 declined",
//!     ErrorType::Integration,
//!     Severity::High,
//!     "checkout",
//! ))?;
//! assert!(stored.group_id.is_some());
//!
//! let alerts = pipeline.wait_for_alerts().await;
//! assert!(alerts.rules_triggered.is_empty());
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod logging;
pub mod pipeline;

pub use config::{LogConfig, ServiceConfig, StoreConfig};
pub use error::{Result, ServiceError};
pub use logging::init_logging;
pub use pipeline::{IngestReport, Pipeline};
