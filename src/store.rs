use std::{
    collections::{btree_map, BTreeMap},
    fs::File,
    io::{self, BufRead, BufReader},
    ops::Bound,
    path::{Path, PathBuf},
    str::FromStr,
    time::Instant,
};

use log::{info, warn};
use miette::Diagnostic;
use thiserror::Error;
use time::{Date, PrimitiveDateTime};

use crate::measurement::{Measurement, ParseMeasurementError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Diagnostic)]
#[error("No measurements loaded")]
pub struct EmptyStoreError;

#[derive(Debug, Error, Diagnostic)]
pub enum LoadError {
    #[error("Could not open `{}`", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Could not read measurements: {0}")]
    Read(#[from] io::Error),
    #[error("Bad measurement on line {line}: {source}")]
    Parse {
        line: usize,
        #[source]
        source: ParseMeasurementError,
    },
}

/// All measurements of a station, ordered by the moment they were taken.
///
/// Built once from the input file and only read afterwards.
#[derive(Debug, Clone, Default)]
pub struct MeasurementStore {
    measurements: BTreeMap<PrimitiveDateTime, Measurement>,
}

impl MeasurementStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads one record per line. Blank lines are skipped, the first malformed
    /// line aborts the load.
    pub fn from_reader(reader: impl BufRead) -> Result<Self, LoadError> {
        let start = Instant::now();
        let mut store = Self::new();

        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let measurement = line.parse().map_err(|source| LoadError::Parse {
                line: index + 1,
                source,
            })?;
            if let Some(previous) = store.insert(measurement) {
                warn!("Line {}: overwriting `{previous}` (normalised)", index + 1);
            }
        }

        info!(
            "Loaded {} measurements in {:?}",
            store.len(),
            start.elapsed()
        );
        Ok(store)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        info!("Loading measurements from {}", path.display());
        let file = File::open(path).map_err(|source| LoadError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_reader(BufReader::new(file))
    }

    /// Stores the measurement under its date-time, returning the one it replaced.
    pub fn insert(&mut self, measurement: Measurement) -> Option<Measurement> {
        self.measurements
            .insert(measurement.date_time(), measurement)
    }

    /// Measurements taken from `from` at midnight up to, but excluding, the
    /// midnight following `to`. A reversed range is empty.
    pub fn range_view(&self, from: Date, to: Date) -> RangeView<'_> {
        if from > to {
            return RangeView { inner: None };
        }
        let end = match to.next_day() {
            Some(next) => Bound::Excluded(next.midnight()),
            None => Bound::Unbounded,
        };
        RangeView {
            inner: Some(
                self.measurements
                    .range((Bound::Included(from.midnight()), end)),
            ),
        }
    }

    pub fn first_key(&self) -> Result<PrimitiveDateTime, EmptyStoreError> {
        self.measurements
            .first_key_value()
            .map(|(key, _)| *key)
            .ok_or(EmptyStoreError)
    }

    pub fn last_key(&self) -> Result<PrimitiveDateTime, EmptyStoreError> {
        self.measurements
            .last_key_value()
            .map(|(key, _)| *key)
            .ok_or(EmptyStoreError)
    }

    pub fn len(&self) -> usize {
        self.measurements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.measurements.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Measurement> + '_ {
        self.measurements.values()
    }
}

impl FromStr for MeasurementStore {
    type Err = LoadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_reader(s.as_bytes())
    }
}

impl FromIterator<Measurement> for MeasurementStore {
    fn from_iter<I: IntoIterator<Item = Measurement>>(iter: I) -> Self {
        let mut store = Self::new();
        store.extend(iter);
        store
    }
}

impl Extend<Measurement> for MeasurementStore {
    fn extend<I: IntoIterator<Item = Measurement>>(&mut self, iter: I) {
        for measurement in iter {
            self.insert(measurement);
        }
    }
}

/// Borrowed, ordered slice of a [`MeasurementStore`]. Cloning it restarts the
/// traversal from the beginning of the range.
#[derive(Debug, Clone)]
pub struct RangeView<'a> {
    inner: Option<btree_map::Range<'a, PrimitiveDateTime, Measurement>>,
}

impl<'a> Iterator for RangeView<'a> {
    type Item = &'a Measurement;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.as_mut()?.next().map(|(_, measurement)| measurement)
    }
}
