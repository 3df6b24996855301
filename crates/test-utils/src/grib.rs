//! Minimal GRIB2 messages for decoder tests.
//!
//! Every message holds one field on a regular lat/lon grid running from
//! 10°N down to the equator and from 0° to 90°E, scanned west to east and
//! north to south. Values are simple-packed at 16 bits with no scaling, so
//! they decode exactly when they are whole steps above the field minimum.

use chrono::{DateTime, Datelike, Timelike, Utc};

pub const GRIB_NORTH: f64 = 10.0;
pub const GRIB_SOUTH: f64 = 0.0;
pub const GRIB_WEST: f64 = 0.0;
pub const GRIB_EAST: f64 = 90.0;

/// One field at one lead time.
#[derive(Debug, Clone)]
pub struct GribSlice {
    pub discipline: u8,
    pub category: u8,
    pub number: u8,
    pub lead_hours: u32,
    /// Points along a latitude row
    pub ni: u32,
    /// Rows
    pub nj: u32,
    /// Row-major from the north-west corner
    pub values: Vec<f32>,
}

impl GribSlice {
    pub fn new(parameter: (u8, u8, u8), lead_hours: u32, ni: u32, nj: u32, values: Vec<f32>) -> Self {
        let (discipline, category, number) = parameter;
        assert_eq!(values.len(), (ni * nj) as usize, "values do not fill the grid");
        Self {
            discipline,
            category,
            number,
            lead_hours,
            ni,
            nj,
            values,
        }
    }
}

/// Concatenate one message per slice into a GRIB2 file.
pub fn grib2_file(slices: &[GribSlice], base_time: DateTime<Utc>) -> Vec<u8> {
    slices
        .iter()
        .flat_map(|slice| grib2_message(slice, base_time))
        .collect()
}

/// Encode a single GRIB2 message.
pub fn grib2_message(slice: &GribSlice, base_time: DateTime<Utc>) -> Vec<u8> {
    let points = slice.ni * slice.nj;

    // Section 1: identification
    let mut sect1 = section(1, 21);
    sect1.extend(98u16.to_be_bytes()); // ECMWF
    sect1.extend(0u16.to_be_bytes());
    sect1.extend([5, 0, 1]);
    sect1.extend((base_time.year() as u16).to_be_bytes());
    sect1.extend([
        base_time.month() as u8,
        base_time.day() as u8,
        base_time.hour() as u8,
        base_time.minute() as u8,
        base_time.second() as u8,
        0,
        1,
    ]);

    // Section 3: grid definition, template 3.0
    let mut sect3 = section(3, 72);
    sect3.push(0);
    sect3.extend(points.to_be_bytes());
    sect3.extend([0, 0]);
    sect3.extend(0u16.to_be_bytes());
    sect3.push(6);
    sect3.extend([0u8; 15]);
    sect3.extend(slice.ni.to_be_bytes());
    sect3.extend(slice.nj.to_be_bytes());
    sect3.extend(0u32.to_be_bytes());
    sect3.extend(0u32.to_be_bytes());
    sect3.extend(microdegrees(GRIB_NORTH));
    sect3.extend(microdegrees(GRIB_WEST));
    sect3.push(48);
    sect3.extend(microdegrees(GRIB_SOUTH));
    sect3.extend(microdegrees(GRIB_EAST));
    sect3.extend(microdegrees((GRIB_EAST - GRIB_WEST) / (slice.ni.max(2) - 1) as f64));
    sect3.extend(microdegrees((GRIB_NORTH - GRIB_SOUTH) / (slice.nj.max(2) - 1) as f64));
    sect3.push(0);

    // Section 4: product definition, template 4.0
    let mut sect4 = section(4, 34);
    sect4.extend(0u16.to_be_bytes());
    sect4.extend(0u16.to_be_bytes());
    sect4.extend([slice.category, slice.number, 2, 0, 0]);
    sect4.extend(0u16.to_be_bytes());
    sect4.extend([0, 1]);
    sect4.extend(slice.lead_hours.to_be_bytes());
    sect4.extend([1, 0]);
    sect4.extend(0u32.to_be_bytes());
    sect4.extend([255, 0]);
    sect4.extend(0u32.to_be_bytes());

    // Section 5: simple packing, template 5.0
    let reference = slice.values.iter().copied().fold(f32::INFINITY, f32::min);
    let mut sect5 = section(5, 21);
    sect5.extend(points.to_be_bytes());
    sect5.extend(0u16.to_be_bytes());
    sect5.extend(reference.to_be_bytes());
    sect5.extend(0u16.to_be_bytes());
    sect5.extend(0u16.to_be_bytes());
    sect5.extend([16, 0]);

    // Section 6: no bitmap
    let mut sect6 = section(6, 6);
    sect6.push(255);

    // Section 7: data
    let mut sect7 = section(7, 5 + 2 * points);
    for value in &slice.values {
        let packed = (value - reference).round() as u16;
        sect7.extend(packed.to_be_bytes());
    }

    let body: Vec<u8> = [sect1, sect3, sect4, sect5, sect6, sect7].concat();
    let total = (16 + body.len() + 4) as u64;

    let mut message = Vec::with_capacity(total as usize);
    message.extend(b"GRIB");
    message.extend([0, 0, slice.discipline, 2]);
    message.extend(total.to_be_bytes());
    message.extend(body);
    message.extend(b"7777");
    message
}

fn section(number: u8, length: u32) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(length as usize);
    bytes.extend(length.to_be_bytes());
    bytes.push(number);
    bytes
}

/// Sign-and-magnitude microdegrees.
fn microdegrees(degrees: f64) -> [u8; 4] {
    let magnitude = (degrees.abs() * 1e6).round() as u32;
    let sign = if degrees < 0.0 { 0x8000_0000 } else { 0 };
    (magnitude | sign).to_be_bytes()
}
