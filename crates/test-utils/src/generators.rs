//! Synthetic atmospheric grids.
//!
//! Values follow smooth, predictable patterns in the units the provider
//! delivers (mixing ratios for trace gases), so grids built here go through
//! the same harmonisation as decoded files.

use atmos_grid::{AtmosphericGrid, GridField, GridLevel, RawGrid};
use chrono::{DateTime, Utc};

/// Axes of a synthetic grid.
#[derive(Debug, Clone)]
pub struct GridSpec {
    pub lead_hours: Vec<u32>,
    /// North to south, like CAMS.
    pub latitudes: Vec<f64>,
    /// 0 to 360 east, like CAMS before normalisation.
    pub longitudes: Vec<f64>,
}

impl GridSpec {
    /// Regular global grid with `step` degree spacing and 3-hourly leads.
    pub fn global(step: f64, lead_count: u32) -> Self {
        let rows = (180.0 / step).round() as usize + 1;
        let cols = (360.0 / step).round() as usize;
        Self {
            lead_hours: (0..lead_count).map(|i| i * 3).collect(),
            latitudes: (0..rows).map(|i| 90.0 - i as f64 * step).collect(),
            longitudes: (0..cols).map(|i| i as f64 * step).collect(),
        }
    }

    /// 30 degree grid with 9 lead times (0 to 24 h).
    pub fn coarse() -> Self {
        Self::global(30.0, 9)
    }

    pub fn len(&self) -> usize {
        self.lead_hours.len() * self.latitudes.len() * self.longitudes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Plausible provider value for a field at one grid point.
///
/// - particulates: 5 to 45 µg/m³ as kg m**-3
/// - trace gases: mixing ratios around 1e-8 kg/kg
/// - temperature: 250 K at the poles to 300 K at the equator
/// - surface pressure: 101325 Pa with a small zonal wave
/// - wind: -10 to 10 m/s
pub fn realistic_value(field: GridField, lead: usize, latitude: f64, longitude: f64) -> f32 {
    let equator = 1.0 - latitude.abs() / 90.0;
    let wave = (longitude.to_radians()).sin();
    let diurnal = (lead as f64 * 0.25).sin() * 0.1;
    let value = match field {
        GridField::Pm10 => (25.0 + 20.0 * equator * (1.0 + diurnal)) * 1.0e-9,
        GridField::Pm2_5 => (12.0 + 10.0 * equator * (1.0 + diurnal)) * 1.0e-9,
        GridField::SurfacePressure => 101_325.0 + 500.0 * wave,
        GridField::Temperature => 250.0 + 50.0 * equator,
        GridField::WindU10 => 10.0 * wave,
        GridField::WindV10 => -10.0 * wave,
        GridField::NitrogenDioxide => (1.0 + equator + diurnal) * 1.0e-8,
        GridField::Ozone => (4.0 + equator + diurnal) * 1.0e-8,
        GridField::SulphurDioxide => (0.5 + equator) * 1.0e-8,
    };
    value as f32
}

/// Builds the single-level and model-level raw grids for `spec`.
pub fn synthetic_raw_grids(
    spec: &GridSpec,
    base_time: DateTime<Utc>,
    value: impl Fn(GridField, usize, f64, f64) -> f32,
) -> (RawGrid, RawGrid) {
    let mut single = RawGrid::new(
        base_time,
        GridLevel::SingleLevel,
        spec.lead_hours.clone(),
        spec.latitudes.clone(),
        spec.longitudes.clone(),
    );
    let mut model = RawGrid::new(
        base_time,
        GridLevel::ModelLevel,
        spec.lead_hours.clone(),
        spec.latitudes.clone(),
        spec.longitudes.clone(),
    );

    for field in GridField::ALL {
        let mut values = Vec::with_capacity(spec.len());
        for lead in 0..spec.lead_hours.len() {
            for &lat in &spec.latitudes {
                for &lon in &spec.longitudes {
                    values.push(value(field, lead, lat, lon));
                }
            }
        }
        let target = match field.level() {
            GridLevel::SingleLevel => &mut single,
            GridLevel::ModelLevel => &mut model,
        };
        target
            .insert_field(field, field.native_units(), values)
            .expect("synthetic field matches its axes");
    }

    (single, model)
}

/// A harmonised grid with realistic values.
pub fn synthetic_grid(spec: &GridSpec, base_time: DateTime<Utc>) -> AtmosphericGrid {
    let (single, model) = synthetic_raw_grids(spec, base_time, realistic_value);
    AtmosphericGrid::from_raw(single, model).expect("synthetic grids share axes")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_coarse_spec() {
        let spec = GridSpec::coarse();
        assert_eq!(spec.latitudes.len(), 7);
        assert_eq!(spec.longitudes.len(), 12);
        assert_eq!(spec.lead_hours.last(), Some(&24));
    }

    #[test]
    fn test_synthetic_grid_builds() {
        let base_time = Utc.with_ymd_and_hms(2024, 5, 22, 0, 0, 0).unwrap();
        let grid = synthetic_grid(&GridSpec::coarse(), base_time);
        assert_eq!(grid.lead_hours().len(), 9);
        assert!(grid.longitudes().iter().all(|&l| l > -180.0 && l <= 180.0));
    }
}
