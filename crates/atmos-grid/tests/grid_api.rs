//! Public API behaviour of AtmosphericGrid built from synthetic raw grids.

use aq_common::{Location, Pollutant};
use atmos_grid::{
    validate_field_table, AtmosphericGrid, GridError, GridField, GridLevel, RawGrid,
    CONCENTRATION_UNITS,
};
use chrono::{TimeZone, Utc};

fn build(longitudes: Vec<f64>) -> AtmosphericGrid {
    let base_time = Utc.with_ymd_and_hms(2024, 5, 22, 12, 0, 0).unwrap();
    let leads = vec![0, 3, 6];
    let lats = vec![60.0, 30.0, 0.0, -30.0, -60.0];
    let n = leads.len() * lats.len() * longitudes.len();

    let mut single = RawGrid::new(
        base_time,
        GridLevel::SingleLevel,
        leads.clone(),
        lats.clone(),
        longitudes.clone(),
    );
    let mut model = RawGrid::new(base_time, GridLevel::ModelLevel, leads, lats, longitudes);
    for field in GridField::ALL {
        let value = match field {
            GridField::SurfacePressure => 101_325.0,
            GridField::Temperature => 288.0,
            _ => 2.0e-8,
        };
        let grid = match field.level() {
            GridLevel::SingleLevel => &mut single,
            GridLevel::ModelLevel => &mut model,
        };
        grid.insert_field(field, field.native_units(), vec![value; n])
            .unwrap();
    }
    AtmosphericGrid::from_raw(single, model).unwrap()
}

#[test]
fn field_table_validates() {
    validate_field_table().unwrap();
}

#[test]
fn longitudes_are_normalised_and_ascending() {
    let grid = build((0..8).map(|i| i as f64 * 45.0).collect());
    let lons = grid.longitudes();
    assert!(lons.windows(2).all(|w| w[0] < w[1]));
    assert!(lons.iter().all(|&l| l > -180.0 && l <= 180.0));
    assert_eq!(lons.first(), Some(&-135.0));
    assert_eq!(lons.last(), Some(&180.0));
}

#[test]
fn series_cover_every_lead_time() {
    let grid = build(vec![-90.0, 0.0, 90.0, 180.0]);
    let locations = vec![
        Location::city("Paris", 48.85, 2.35),
        Location::city("Sydney", -33.87, 151.21),
        Location::city("Pole", 89.9, 0.0),
    ];
    let series = grid
        .series_for_locations(&locations, &Pollutant::ALL)
        .unwrap();

    assert_eq!(series.len(), 3);
    for per_location in &series {
        assert_eq!(per_location.len(), Pollutant::ALL.len());
        for values in per_location.values() {
            assert_eq!(values.len(), 3);
            assert!(values.iter().all(|v| v.is_finite() && *v > 0.0));
        }
    }
}

#[test]
fn every_pollutant_ends_up_as_concentration() {
    let grid = build(vec![0.0, 120.0, 240.0]);
    for pollutant in Pollutant::ALL {
        let field = GridField::for_pollutant(pollutant);
        assert_eq!(grid.units(field).unwrap(), CONCENTRATION_UNITS);
    }
}

#[test]
fn mismatched_latitudes_are_rejected() {
    let base_time = Utc.with_ymd_and_hms(2024, 5, 22, 12, 0, 0).unwrap();
    let single = RawGrid::new(base_time, GridLevel::SingleLevel, vec![0], vec![0.0], vec![0.0]);
    let model = RawGrid::new(base_time, GridLevel::ModelLevel, vec![0], vec![1.0], vec![0.0]);
    let result = AtmosphericGrid::from_raw(single, model);
    assert!(matches!(
        result,
        Err(GridError::AxisMismatch {
            axis: "latitude",
            ..
        })
    ));
}
