//! Decoding hand-built GRIB2 files through the `grib` crate.

use atmos_grid::{decode_grib_bytes, AtmosphericGrid, GridError, GridField, GridLevel};
use chrono::{DateTime, TimeZone, Utc};
use test_utils::{grib2_file, GribSlice};

fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 22, 0, 0, 0).unwrap()
}

fn code(field: GridField) -> (u8, u8, u8) {
    field.grib_codes()[0]
}

fn constant(field: GridField, lead_hours: u32, value: f32) -> GribSlice {
    GribSlice::new(code(field), lead_hours, 3, 2, vec![value; 6])
}

/// Six values counting up from `start`.
fn ramp(field: GridField, lead_hours: u32, start: f32) -> GribSlice {
    let values = (0..6).map(|i| start + i as f32).collect();
    GribSlice::new(code(field), lead_hours, 3, 2, values)
}

#[test]
fn slices_are_stacked_by_field_and_lead_time() {
    let file = grib2_file(
        &[
            ramp(GridField::SurfacePressure, 3, 101_306.0),
            ramp(GridField::SurfacePressure, 0, 101_300.0),
            ramp(GridField::Pm2_5, 0, 1.0),
            ramp(GridField::Pm2_5, 3, 7.0),
        ],
        base_time(),
    );

    let raw = decode_grib_bytes(&file, base_time(), GridLevel::SingleLevel).unwrap();

    assert_eq!(raw.base_time, base_time());
    assert_eq!(raw.lead_hours, vec![0, 3]);
    assert_eq!(raw.latitudes, vec![10.0, 0.0]);
    assert_eq!(raw.longitudes, vec![0.0, 45.0, 90.0]);
    assert_eq!(raw.fields.len(), 2);

    let pressure = &raw.fields[&GridField::SurfacePressure];
    assert_eq!(pressure.units, "Pa");
    assert_eq!(pressure.values.first(), Some(&101_300.0));
    assert_eq!(pressure.values.last(), Some(&101_311.0));
    assert_eq!(
        raw.fields[&GridField::Pm2_5].values,
        (1..=12).map(|v| v as f32).collect::<Vec<_>>()
    );
}

#[test]
fn unknown_parameters_are_skipped() {
    let file = grib2_file(
        &[
            // Total precipitation
            GribSlice::new((0, 1, 8), 0, 3, 2, vec![0.0; 6]),
            constant(GridField::WindU10, 0, 4.0),
            // Model-level temperature does not belong in a single-level file
            constant(GridField::Temperature, 0, 280.0),
        ],
        base_time(),
    );

    let raw = decode_grib_bytes(&file, base_time(), GridLevel::SingleLevel).unwrap();

    assert_eq!(raw.fields.keys().copied().collect::<Vec<_>>(), vec![GridField::WindU10]);
    assert_eq!(raw.fields[&GridField::WindU10].values, vec![4.0; 6]);
}

#[test]
fn file_without_known_fields_is_rejected() {
    let file = grib2_file(&[GribSlice::new((0, 1, 8), 0, 3, 2, vec![0.0; 6])], base_time());

    let result = decode_grib_bytes(&file, base_time(), GridLevel::SingleLevel);
    assert!(matches!(result, Err(GridError::Decode(_))));
}

#[test]
fn differing_grid_shapes_are_rejected() {
    let file = grib2_file(
        &[
            constant(GridField::WindU10, 0, 4.0),
            GribSlice::new(code(GridField::WindV10), 0, 2, 2, vec![1.0; 4]),
        ],
        base_time(),
    );

    let result = decode_grib_bytes(&file, base_time(), GridLevel::SingleLevel);
    assert!(matches!(result, Err(GridError::AxisMismatch { axis: "grid", .. })));
}

#[test]
fn missing_lead_time_is_rejected() {
    let file = grib2_file(
        &[
            constant(GridField::WindU10, 0, 4.0),
            constant(GridField::WindU10, 3, 4.0),
            constant(GridField::WindV10, 0, 1.0),
        ],
        base_time(),
    );

    let result = decode_grib_bytes(&file, base_time(), GridLevel::SingleLevel);
    assert!(matches!(
        result,
        Err(GridError::MissingField { field: GridField::WindV10, .. })
    ));
}

#[test]
fn decoded_levels_combine_into_a_grid() {
    let leads = [0, 3];
    let single: Vec<GribSlice> = leads
        .iter()
        .flat_map(|&lead| {
            [
                constant(GridField::Pm10, lead, 20.0),
                constant(GridField::Pm2_5, lead, 10.0),
                constant(GridField::SurfacePressure, lead, 101_325.0),
                constant(GridField::WindU10, lead, 3.0),
                constant(GridField::WindV10, lead, 4.0),
            ]
        })
        .collect();
    let model: Vec<GribSlice> = leads
        .iter()
        .flat_map(|&lead| {
            [
                constant(GridField::NitrogenDioxide, lead, 1.0),
                constant(GridField::Ozone, lead, 2.0),
                constant(GridField::SulphurDioxide, lead, 1.0),
                constant(GridField::Temperature, lead, 288.0),
            ]
        })
        .collect();

    let single_file = grib2_file(&single, base_time());
    let model_file = grib2_file(&model, base_time());
    let single = decode_grib_bytes(&single_file, base_time(), GridLevel::SingleLevel).unwrap();
    let model = decode_grib_bytes(&model_file, base_time(), GridLevel::ModelLevel).unwrap();
    let grid = AtmosphericGrid::from_raw(single, model).unwrap();

    assert_eq!(grid.lead_hours(), &[0, 3]);
    assert_eq!(grid.longitudes(), &[0.0, 45.0, 90.0]);
    for field in GridField::ALL {
        assert_eq!(grid.values(field).unwrap().len(), 12, "{}", field);
    }
}
