//! Data model: coordinates, parsed forecast ranges and long-form rows.

use chrono::{Duration, NaiveDateTime};

use crate::error::{ForecastError, LocationError};

/// A validated latitude/longitude pair.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Coordinate {
    latitude: f64,
    longitude: f64,
}

impl Coordinate {
    /// Used whenever no coordinate has been supplied.
    pub const DEFAULT: Coordinate = Coordinate {
        latitude: 35.0,
        longitude: -85.0,
    };

    pub fn new(latitude: f64, longitude: f64) -> Result<Self, LocationError> {
        let lat_ok = latitude.is_finite() && (-90.0..=90.0).contains(&latitude);
        let lon_ok = longitude.is_finite() && (-180.0..=180.0).contains(&longitude);
        if !lat_ok || !lon_ok {
            return Err(LocationError::InvalidCoordinate {
                latitude,
                longitude,
            });
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.4}, {:.4}", self.latitude, self.longitude)
    }
}

/// Current conditions at the response's reference time.
#[derive(Clone, Debug, PartialEq)]
pub struct Snapshot {
    pub time: NaiveDateTime,
    pub interval_seconds: i64,
    /// `(variable, value)` in request order.
    pub values: Vec<(String, f64)>,
}

impl Snapshot {
    pub fn value(&self, variable: &str) -> Option<f64> {
        self.values
            .iter()
            .find(|(name, _)| name == variable)
            .map(|(_, v)| *v)
    }
}

/// One named measure of a `Series`.
#[derive(Clone, Debug, PartialEq)]
pub struct Column {
    pub name: String,
    pub values: Vec<f64>,
}

/// Named numeric columns aligned to a regular time grid.
///
/// The grid is `start, start + interval, ...` up to but excluding `end`.
/// Every column holds exactly one value per grid point.
#[derive(Clone, Debug, PartialEq)]
pub struct Series {
    start: NaiveDateTime,
    end: NaiveDateTime,
    interval_seconds: i64,
    columns: Vec<Column>,
}

impl Series {
    pub fn new(
        start: NaiveDateTime,
        end: NaiveDateTime,
        interval_seconds: i64,
        columns: Vec<Column>,
    ) -> Result<Self, ForecastError> {
        if interval_seconds <= 0 {
            return Err(ForecastError::malformed(format!(
                "non-positive interval {interval_seconds}s"
            )));
        }
        let span = (end - start).num_seconds();
        if span < 0 || span % interval_seconds != 0 {
            return Err(ForecastError::malformed(format!(
                "time range {start} → {end} is not a whole number of {interval_seconds}s steps"
            )));
        }
        let points = (span / interval_seconds) as usize;
        for c in &columns {
            if c.values.len() != points {
                return Err(ForecastError::malformed(format!(
                    "column '{}' has {} values, time grid has {}",
                    c.name,
                    c.values.len(),
                    points
                )));
            }
        }
        Ok(Self {
            start,
            end,
            interval_seconds,
            columns,
        })
    }

    pub fn start(&self) -> NaiveDateTime {
        self.start
    }

    pub fn end(&self) -> NaiveDateTime {
        self.end
    }

    pub fn interval_seconds(&self) -> i64 {
        self.interval_seconds
    }

    /// Number of grid points.
    pub fn len(&self) -> usize {
        ((self.end - self.start).num_seconds() / self.interval_seconds) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn time_at(&self, index: usize) -> NaiveDateTime {
        self.start + Duration::seconds(self.interval_seconds * index as i64)
    }

    pub fn times(&self) -> impl Iterator<Item = NaiveDateTime> + '_ {
        (0..self.len()).map(|i| self.time_at(i))
    }

    /// Keep the first `points` grid points of every column.
    pub fn head(&self, points: usize) -> Series {
        let points = points.min(self.len());
        Series {
            start: self.start,
            end: self.time_at(points),
            interval_seconds: self.interval_seconds,
            columns: self
                .columns
                .iter()
                .map(|c| Column {
                    name: c.name.clone(),
                    values: c.values[..points].to_vec(),
                })
                .collect(),
        }
    }
}

/// Forecast for one coordinate, replaced wholesale on every fetch.
#[derive(Clone, Debug, PartialEq)]
pub struct ParsedForecast {
    pub utc_offset_seconds: i32,
    pub timezone: Option<String>,
    pub current: Snapshot,
    pub hourly: Series,
    pub daily: Series,
}

/// One `(time, measure, value)` triple of an unpivoted series.
#[derive(Clone, Debug, PartialEq)]
pub struct LongFormRow {
    pub time: NaiveDateTime,
    pub measure: String,
    pub value: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    #[test]
    fn coordinate_bounds() {
        assert!(Coordinate::new(90.0, -180.0).is_ok());
        assert!(Coordinate::new(-90.0, 180.0).is_ok());
        assert!(Coordinate::new(90.5, 0.0).is_err());
        assert!(Coordinate::new(0.0, -180.1).is_err());
        assert!(Coordinate::new(f64::NAN, 0.0).is_err());
    }

    #[test]
    fn series_rejects_short_column() {
        let err = Series::new(
            at(1, 0),
            at(1, 3),
            3600,
            vec![Column {
                name: "t".into(),
                values: vec![1.0, 2.0],
            }],
        )
        .unwrap_err();
        assert!(err.to_string().contains("has 2 values, time grid has 3"));
    }

    #[test]
    fn series_rejects_ragged_range() {
        assert!(Series::new(at(1, 0), at(1, 3), 7200, vec![]).is_err());
        assert!(Series::new(at(1, 0), at(1, 3), 0, vec![]).is_err());
    }

    #[test]
    fn head_keeps_grid_consistent() {
        let s = Series::new(
            at(1, 0),
            at(1, 4),
            3600,
            vec![Column {
                name: "t".into(),
                values: vec![1.0, 2.0, 3.0, 4.0],
            }],
        )
        .unwrap();
        let h = s.head(2);
        assert_eq!(h.len(), 2);
        assert_eq!(h.end(), at(1, 2));
        assert_eq!(h.column("t").unwrap().values, vec![1.0, 2.0]);
        assert_eq!(h.times().collect::<Vec<_>>(), vec![at(1, 0), at(1, 1)]);
    }
}
