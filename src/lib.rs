//! Hourly weather station readings and the reports computed over them.
//!
//! Readings come from `date;time;temperature;flag` lines and are kept in a
//! [`MeasurementStore`] ordered by date-time. A [`QueryEngine`] borrows the
//! store to compute, for an inclusive range of dates, the daily mean
//! temperatures, the daily count of missing hourly readings and the share of
//! approved readings.

pub mod measurement;
pub mod query;
pub mod settings;
pub mod store;
pub mod ui;

pub use measurement::{Measurement, ParseMeasurementError};
pub use query::{
    ApprovedShare, DailyAverage, DailyMissing, QueryEngine, QueryError, RangeViolation,
};
pub use settings::{Settings, SettingsError};
pub use store::{EmptyStoreError, LoadError, MeasurementStore, RangeView};
pub use ui::Menu;
