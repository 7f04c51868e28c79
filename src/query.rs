use std::{collections::BTreeMap, fmt, time::Instant};

use log::{debug, warn};
use miette::Diagnostic;
use thiserror::Error;
use time::Date;

use crate::store::{EmptyStoreError, MeasurementStore};

/// One reading per hour.
pub const DEFAULT_READINGS_PER_DAY: u32 = 24;

/// Which bound of a requested range falls outside the data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Diagnostic)]
pub enum RangeViolation {
    #[error("end date {to} is before start date {from}")]
    Reversed { from: Date, to: Date },
    #[error("start date {from} is before the first available data ({first})")]
    StartBeforeData { from: Date, first: Date },
    #[error("start date {from} is after the last available data ({last})")]
    StartAfterData { from: Date, last: Date },
    #[error("end date {to} is after the last available data ({last})")]
    EndAfterData { to: Date, last: Date },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Diagnostic)]
pub enum QueryError {
    #[error(transparent)]
    EmptyStore(#[from] EmptyStoreError),
    #[error("Invalid range: {0}")]
    InvalidRange(#[from] RangeViolation),
    #[error("No measurements between {from} and {to}")]
    NoMatchingData { from: Date, to: Date },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DailyAverage {
    pub date: Date,
    /// Mean temperature of the day, rounded to hundredths.
    pub average: f64,
}

impl fmt::Display for DailyAverage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Debug keeps the `.0` of whole values.
        write!(
            f,
            "{} average temperature: {:?} degrees Celsius",
            self.date, self.average
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyMissing {
    pub date: Date,
    pub missing: u32,
}

impl fmt::Display for DailyMissing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} missing {} values", self.date, self.missing)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApprovedShare {
    pub from: Date,
    pub to: Date,
    pub approved: usize,
    pub total: usize,
}

impl ApprovedShare {
    pub fn percentage(&self) -> f64 {
        self.approved as f64 * 100.0 / self.total as f64
    }
}

impl fmt::Display for ApprovedShare {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Approved values between {} and {}: {:.2} %",
            self.from,
            self.to,
            self.percentage()
        )
    }
}

fn round_to_hundredths(value: f64) -> f64 {
    // `+ 0.0` turns a rounded `-0.0` into `0.0`
    (value * 100.0).round() / 100.0 + 0.0
}

/// Read-only reports over a [`MeasurementStore`].
///
/// Every query takes an inclusive `from..=to` range of calendar dates which must
/// lie within the dates covered by the store. The typed queries report why a
/// range was refused, the line queries log the reason and return no lines.
#[derive(Debug, Clone, Copy)]
pub struct QueryEngine<'a> {
    store: &'a MeasurementStore,
    readings_per_day: u32,
}

impl<'a> QueryEngine<'a> {
    pub fn new(store: &'a MeasurementStore) -> Self {
        Self {
            store,
            readings_per_day: DEFAULT_READINGS_PER_DAY,
        }
    }

    /// Changes the number of readings a complete day is expected to have.
    pub fn with_readings_per_day(mut self, readings_per_day: u32) -> Self {
        self.readings_per_day = readings_per_day;
        self
    }

    /// Checks, in order, that the range is not reversed, that it does not
    /// start before nor after the data, and that it does not end after it.
    pub fn validate_range(&self, from: Date, to: Date) -> Result<(), QueryError> {
        let first = self.store.first_key()?.date();
        let last = self.store.last_key()?.date();

        let violation = if from > to {
            RangeViolation::Reversed { from, to }
        } else if from < first {
            RangeViolation::StartBeforeData { from, first }
        } else if from > last {
            RangeViolation::StartAfterData { from, last }
        } else if to > last {
            RangeViolation::EndAfterData { to, last }
        } else {
            return Ok(());
        };
        Err(violation.into())
    }

    pub fn is_range_valid(&self, from: Date, to: Date) -> bool {
        self.validate_range(from, to).is_ok()
    }

    /// Mean temperature of every day with at least one reading, by date.
    pub fn daily_averages(&self, from: Date, to: Date) -> Result<Vec<DailyAverage>, QueryError> {
        let start = Instant::now();
        self.validate_range(from, to)?;

        let mut days: BTreeMap<Date, (f64, u32)> = BTreeMap::new();
        for measurement in self.store.range_view(from, to) {
            let (sum, count) = days.entry(measurement.date).or_default();
            *sum += measurement.temperature;
            *count += 1;
        }

        let averages: Vec<_> = days
            .into_iter()
            .map(|(date, (sum, count))| DailyAverage {
                date,
                average: round_to_hundredths(sum / f64::from(count)),
            })
            .collect();

        debug!(
            "Averaged {} days between {from} and {to} in {:?}",
            averages.len(),
            start.elapsed()
        );
        Ok(averages)
    }

    /// Number of readings each day with at least one reading lacks, most
    /// incomplete days first and by date among equals. Days without any
    /// reading are not reported.
    pub fn daily_missing(&self, from: Date, to: Date) -> Result<Vec<DailyMissing>, QueryError> {
        let start = Instant::now();
        self.validate_range(from, to)?;

        let mut days: BTreeMap<Date, u32> = BTreeMap::new();
        for measurement in self.store.range_view(from, to) {
            *days.entry(measurement.date).or_default() += 1;
        }

        let mut missing: Vec<_> = days
            .into_iter()
            .map(|(date, readings)| DailyMissing {
                date,
                missing: self.readings_per_day.saturating_sub(readings),
            })
            .collect();
        missing.sort_by(|left, right| {
            right
                .missing
                .cmp(&left.missing)
                .then(left.date.cmp(&right.date))
        });

        debug!(
            "Counted missing values of {} days between {from} and {to} in {:?}",
            missing.len(),
            start.elapsed()
        );
        Ok(missing)
    }

    /// Share of approved readings over the whole range.
    pub fn approved_share(&self, from: Date, to: Date) -> Result<ApprovedShare, QueryError> {
        let start = Instant::now();
        self.validate_range(from, to)?;

        let (approved, total) = self
            .store
            .range_view(from, to)
            .fold((0, 0), |(approved, total), measurement| {
                (approved + usize::from(measurement.approved), total + 1)
            });
        if total == 0 {
            return Err(QueryError::NoMatchingData { from, to });
        }

        debug!(
            "Counted {approved} approved out of {total} values between {from} and {to} in {:?}",
            start.elapsed()
        );
        Ok(ApprovedShare {
            from,
            to,
            approved,
            total,
        })
    }

    pub fn average_temperatures(&self, from: Date, to: Date) -> Vec<String> {
        into_lines(self.daily_averages(from, to))
    }

    pub fn missing_values(&self, from: Date, to: Date) -> Vec<String> {
        into_lines(self.daily_missing(from, to))
    }

    pub fn approved_values(&self, from: Date, to: Date) -> Vec<String> {
        into_lines(self.approved_share(from, to).map(|share| vec![share]))
    }
}

fn into_lines<T: fmt::Display>(rows: Result<Vec<T>, QueryError>) -> Vec<String> {
    match rows {
        Ok(rows) => rows.iter().map(ToString::to_string).collect(),
        Err(error) => {
            warn!("{error}");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use time::macros::date;

    use super::*;
    use crate::measurement::Measurement;

    fn store(lines: &str) -> MeasurementStore {
        lines.parse().unwrap()
    }

    fn hourly(day: Date, temperature: f64, approved: bool) -> impl Iterator<Item = Measurement> {
        (0..24).map(move |hour| {
            Measurement::new(
                day,
                time::Time::from_hms(hour, 0, 0).unwrap(),
                temperature,
                approved,
            )
        })
    }

    #[test]
    fn validation_reports_the_first_failing_bound() {
        let store = store("2000-01-02;00:00:00;1.0;G\n2000-01-05;12:00:00;1.0;G");
        let engine = QueryEngine::new(&store);
        let first = date!(2000 - 01 - 02);
        let last = date!(2000 - 01 - 05);

        assert_eq!(
            engine.validate_range(date!(2000 - 01 - 04), date!(2000 - 01 - 03)),
            Err(RangeViolation::Reversed {
                from: date!(2000 - 01 - 04),
                to: date!(2000 - 01 - 03)
            }
            .into())
        );
        assert_eq!(
            engine.validate_range(date!(2000 - 01 - 01), date!(2000 - 01 - 09)),
            Err(RangeViolation::StartBeforeData {
                from: date!(2000 - 01 - 01),
                first
            }
            .into())
        );
        assert_eq!(
            engine.validate_range(date!(2000 - 01 - 06), date!(2000 - 01 - 07)),
            Err(RangeViolation::StartAfterData {
                from: date!(2000 - 01 - 06),
                last
            }
            .into())
        );
        assert_eq!(
            engine.validate_range(date!(2000 - 01 - 03), date!(2000 - 01 - 06)),
            Err(RangeViolation::EndAfterData {
                to: date!(2000 - 01 - 06),
                last
            }
            .into())
        );
        assert!(engine.is_range_valid(date!(2000 - 01 - 02), date!(2000 - 01 - 05)));
        assert!(engine.is_range_valid(date!(2000 - 01 - 05), date!(2000 - 01 - 05)));
    }

    #[test]
    fn empty_store_is_never_valid() {
        let store = MeasurementStore::new();
        let engine = QueryEngine::new(&store);
        let day = date!(2000 - 01 - 01);
        assert_eq!(
            engine.validate_range(day, day),
            Err(QueryError::EmptyStore(EmptyStoreError))
        );
        assert!(engine.average_temperatures(day, day).is_empty());
        assert!(engine.missing_values(day, day).is_empty());
        assert!(engine.approved_values(day, day).is_empty());
    }

    #[test]
    fn averages_are_rounded_to_hundredths() {
        let store = store(
            "2000-01-01;00:00:00;1.0;G\n\
             2000-01-01;01:00:00;1.0;G\n\
             2000-01-01;02:00:00;0.0;G\n\
             2000-01-02;00:00:00;2.0;G\n\
             2000-01-03;00:00:00;-0.001;G\n\
             2000-01-04;00:00:00;0.125;G",
        );
        let engine = QueryEngine::new(&store);
        assert_eq!(
            engine.average_temperatures(date!(2000 - 01 - 01), date!(2000 - 01 - 04)),
            [
                "2000-01-01 average temperature: 0.67 degrees Celsius",
                "2000-01-02 average temperature: 2.0 degrees Celsius",
                "2000-01-03 average temperature: 0.0 degrees Celsius",
                "2000-01-04 average temperature: 0.13 degrees Celsius",
            ]
        );
    }

    #[test]
    fn days_without_readings_are_skipped() {
        let store = store("2000-01-01;00:00:00;1.0;G\n2000-01-04;00:00:00;3.0;Y");
        let engine = QueryEngine::new(&store);
        let (from, to) = (date!(2000 - 01 - 01), date!(2000 - 01 - 04));

        let dates: Vec<Date> = engine
            .daily_averages(from, to)
            .unwrap()
            .iter()
            .map(|day| day.date)
            .collect();
        assert_eq!(dates, [from, to]);
        assert_eq!(
            engine.missing_values(from, to),
            ["2000-01-01 missing 23 values", "2000-01-04 missing 23 values"]
        );
    }

    #[test]
    fn missing_values_sorted_by_count_then_date() {
        let mut store = MeasurementStore::new();
        store.extend(hourly(date!(2000 - 01 - 01), 1.0, true));
        store.extend(hourly(date!(2000 - 01 - 02), 1.0, true).skip(2));
        store.extend(hourly(date!(2000 - 01 - 03), 1.0, true).skip(5));
        store.extend(hourly(date!(2000 - 01 - 04), 1.0, true).skip(2));
        let engine = QueryEngine::new(&store);

        assert_eq!(
            engine.missing_values(date!(2000 - 01 - 01), date!(2000 - 01 - 04)),
            [
                "2000-01-03 missing 5 values",
                "2000-01-02 missing 2 values",
                "2000-01-04 missing 2 values",
                "2000-01-01 missing 0 values",
            ]
        );
    }

    #[test]
    fn missing_count_follows_expected_readings() {
        let store: MeasurementStore = hourly(date!(2000 - 01 - 01), 1.0, true).collect();
        let engine = QueryEngine::new(&store).with_readings_per_day(12);
        let day = date!(2000 - 01 - 01);
        assert_eq!(
            engine.daily_missing(day, day).unwrap(),
            [DailyMissing {
                date: day,
                missing: 0
            }]
        );
    }

    #[test]
    fn approved_percentage_has_two_decimals() {
        let mut store = MeasurementStore::new();
        store.extend(hourly(date!(2000 - 01 - 01), 1.0, true).take(1));
        store.extend(hourly(date!(2000 - 01 - 02), 1.0, false).take(2));
        let engine = QueryEngine::new(&store);
        let (from, to) = (date!(2000 - 01 - 01), date!(2000 - 01 - 02));

        assert_eq!(
            engine.approved_values(from, to),
            ["Approved values between 2000-01-01 and 2000-01-02: 33.33 %"]
        );
        let share = engine.approved_share(from, to).unwrap();
        assert_eq!((share.approved, share.total), (1, 3));
    }

    #[test]
    fn approved_share_of_a_gap_is_no_data() {
        let store = store("2000-01-01;00:00:00;1.0;G\n2000-01-04;00:00:00;3.0;Y");
        let engine = QueryEngine::new(&store);
        let (from, to) = (date!(2000 - 01 - 02), date!(2000 - 01 - 03));

        assert_eq!(
            engine.approved_share(from, to),
            Err(QueryError::NoMatchingData { from, to })
        );
        assert!(engine.approved_values(from, to).is_empty());
        assert!(engine.average_temperatures(from, to).is_empty());
        assert!(engine.missing_values(from, to).is_empty());
    }

    #[test]
    fn invalid_ranges_give_no_lines() {
        let store: MeasurementStore = hourly(date!(2000 - 01 - 01), 1.0, true).collect();
        let engine = QueryEngine::new(&store);
        for (from, to) in [
            (date!(2000 - 01 - 01), date!(1999 - 12 - 31)),
            (date!(1999 - 12 - 31), date!(2000 - 01 - 01)),
            (date!(2000 - 01 - 02), date!(2000 - 01 - 02)),
            (date!(2000 - 01 - 01), date!(2000 - 01 - 02)),
        ] {
            assert!(engine.average_temperatures(from, to).is_empty());
            assert!(engine.missing_values(from, to).is_empty());
            assert!(engine.approved_values(from, to).is_empty());
        }
    }
}
