//! # flex-core: shared types for firm capacity analysis
//!
//! Holds what every other crate in the workspace needs:
//!
//! - [`DemandSeries`] - validated, timestamped demand samples for one substation
//! - [`units`] - MW / MWh / h newtypes
//! - [`FlexError`] - the unified error type and [`FlexResult`] alias
//! - [`calendar`] - month and weekday helpers used by the competition builders

pub mod calendar;
pub mod error;
pub mod series;
pub mod units;

pub use error::{FlexError, FlexResult};
pub use series::{DemandSeries, DEFAULT_INTERVAL_HOURS};
pub use units::{Hours, MegawattHours, Megawatts};
