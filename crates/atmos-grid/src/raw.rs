//! Raw decoded grids, before harmonisation.
//!
//! Values are `f32`, lead-time major then row-major (latitude rows,
//! longitude columns), matching the order fields are decoded in.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::error::{GridError, GridResult};
use crate::fields::{GridField, GridLevel};

#[derive(Debug, Clone, PartialEq)]
pub struct RawField {
    pub units: String,
    pub values: Vec<f32>,
}

/// One provider file's worth of fields on a shared axis set.
#[derive(Debug, Clone)]
pub struct RawGrid {
    pub base_time: DateTime<Utc>,
    pub level: GridLevel,
    pub lead_hours: Vec<u32>,
    pub latitudes: Vec<f64>,
    pub longitudes: Vec<f64>,
    pub fields: BTreeMap<GridField, RawField>,
}

impl RawGrid {
    pub fn new(
        base_time: DateTime<Utc>,
        level: GridLevel,
        lead_hours: Vec<u32>,
        latitudes: Vec<f64>,
        longitudes: Vec<f64>,
    ) -> Self {
        Self {
            base_time,
            level,
            lead_hours,
            latitudes,
            longitudes,
            fields: BTreeMap::new(),
        }
    }

    /// Number of values one field must hold.
    pub fn field_len(&self) -> usize {
        self.lead_hours.len() * self.latitudes.len() * self.longitudes.len()
    }

    /// Add a field, checking its length against the axes.
    pub fn with_field(
        mut self,
        field: GridField,
        units: impl Into<String>,
        values: Vec<f32>,
    ) -> GridResult<Self> {
        self.insert_field(field, units, values)?;
        Ok(self)
    }

    pub fn insert_field(
        &mut self,
        field: GridField,
        units: impl Into<String>,
        values: Vec<f32>,
    ) -> GridResult<()> {
        if values.len() != self.field_len() {
            return Err(GridError::Shape(format!(
                "{} has {} values, axes ({} x {} x {}) need {}",
                field,
                values.len(),
                self.lead_hours.len(),
                self.latitudes.len(),
                self.longitudes.len(),
                self.field_len()
            )));
        }
        self.fields.insert(
            field,
            RawField {
                units: units.into(),
                values,
            },
        );
        Ok(())
    }

    /// Apply [`normalize_longitude`] to the axis and re-sort every field's
    /// columns ascending. Applying it twice changes nothing.
    pub fn normalize_longitudes(&mut self) {
        let normalized: Vec<f64> = self.longitudes.iter().map(|&l| normalize_longitude(l)).collect();
        let mut order: Vec<usize> = (0..normalized.len()).collect();
        order.sort_by(|&a, &b| normalized[a].total_cmp(&normalized[b]));

        let already_sorted = order.iter().enumerate().all(|(i, &j)| i == j);
        self.longitudes = order.iter().map(|&j| normalized[j]).collect();
        if already_sorted {
            return;
        }

        let width = self.longitudes.len();
        for field in self.fields.values_mut() {
            let mut reordered = Vec::with_capacity(field.values.len());
            for row in field.values.chunks_exact(width) {
                reordered.extend(order.iter().map(|&j| row[j]));
            }
            field.values = reordered;
        }
    }
}

/// Shift a longitude east of 180° down by 360°. Provider longitudes in
/// [0, 360) land in (-180, 180]; anything at or below 180° is returned as is.
pub fn normalize_longitude(longitude: f64) -> f64 {
    if longitude > 180.0 {
        longitude - 360.0
    } else {
        longitude
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_normalize_longitude() {
        assert_eq!(normalize_longitude(0.0), 0.0);
        assert!(approx(normalize_longitude(179.6), 179.6));
        assert!(approx(normalize_longitude(180.4), -179.6));
        assert_eq!(normalize_longitude(360.0), 0.0);
        assert_eq!(normalize_longitude(-0.1), -0.1);
        assert_eq!(normalize_longitude(180.0), 180.0);
    }

    #[test]
    fn test_normalize_longitude_leaves_western_values() {
        assert_eq!(normalize_longitude(-180.0), -180.0);
        assert_eq!(normalize_longitude(-179.9), -179.9);
        assert_eq!(normalize_longitude(-200.0), -200.0);
    }

    #[test]
    fn test_normalize_longitude_idempotent() {
        for l in [0.0, 12.5, 179.6, 180.0, 180.4, 270.0, 359.6, -0.1, -179.9] {
            let once = normalize_longitude(l);
            assert_eq!(normalize_longitude(once), once);
        }
    }

    #[test]
    fn test_columns_follow_longitudes() {
        let base_time = Utc.with_ymd_and_hms(2024, 5, 22, 0, 0, 0).unwrap();
        // Two rows, four columns at 0, 90, 180, 270 degrees east
        let mut grid = RawGrid::new(
            base_time,
            GridLevel::SingleLevel,
            vec![0],
            vec![10.0, 0.0],
            vec![0.0, 90.0, 180.0, 270.0],
        )
        .with_field(
            GridField::Pm10,
            "kg m**-3",
            vec![0.0, 1.0, 2.0, 3.0, 10.0, 11.0, 12.0, 13.0],
        )
        .unwrap();

        grid.normalize_longitudes();
        assert_eq!(grid.longitudes, vec![-90.0, 0.0, 90.0, 180.0]);
        assert_eq!(
            grid.fields[&GridField::Pm10].values,
            vec![3.0, 0.0, 1.0, 2.0, 13.0, 10.0, 11.0, 12.0]
        );

        let snapshot = grid.fields[&GridField::Pm10].values.clone();
        grid.normalize_longitudes();
        assert_eq!(grid.longitudes, vec![-90.0, 0.0, 90.0, 180.0]);
        assert_eq!(grid.fields[&GridField::Pm10].values, snapshot);
    }

    #[test]
    fn test_rejects_wrong_length() {
        let base_time = Utc.with_ymd_and_hms(2024, 5, 22, 0, 0, 0).unwrap();
        let result = RawGrid::new(base_time, GridLevel::ModelLevel, vec![0, 3], vec![0.0], vec![0.0])
            .with_field(GridField::Temperature, "K", vec![280.0]);
        assert!(matches!(result, Err(GridError::Shape(_))));
    }
}
