//! Texture variables and their fixed reference ranges.

use aq_common::Pollutant;
use atmos_grid::{GridField, CONCENTRATION_UNITS};

/// A variable rendered into textures: one pollutant, or the two 10 m wind
/// components packed into red and green.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureVariable {
    Pollutant(Pollutant),
    Winds10m,
}

/// Value range mapped onto 0..=255.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReferenceRange {
    pub min: f64,
    pub max: f64,
}

impl ReferenceRange {
    /// Normalise a value into 0..=255, clipping outside the range.
    /// NaN maps to 0. Returns the byte and whether the value was clipped.
    pub fn to_byte(&self, value: f32) -> (u8, bool) {
        if value.is_nan() {
            return (0, false);
        }
        let scaled = (value as f64 - self.min) / (self.max - self.min) * 255.0;
        let clipped = !(0.0..=255.0).contains(&scaled);
        (scaled.clamp(0.0, 255.0).round() as u8, clipped)
    }
}

impl TextureVariable {
    pub fn all() -> Vec<TextureVariable> {
        Pollutant::ALL
            .into_iter()
            .map(TextureVariable::Pollutant)
            .chain(std::iter::once(TextureVariable::Winds10m))
            .collect()
    }

    /// Name used in metadata and asset paths.
    pub fn name(&self) -> &'static str {
        match self {
            TextureVariable::Pollutant(p) => p.field_name(),
            TextureVariable::Winds10m => "winds_10m",
        }
    }

    pub fn range(&self) -> ReferenceRange {
        let (min, max) = match self {
            TextureVariable::Pollutant(Pollutant::NitrogenDioxide) => (0.0, 1.0e-7),
            TextureVariable::Pollutant(Pollutant::Ozone) => (0.0, 5.0e-7),
            TextureVariable::Pollutant(Pollutant::Pm10) => (0.0, 1.0e-6),
            TextureVariable::Pollutant(Pollutant::Pm2_5) => (0.0, 1.0e-6),
            TextureVariable::Pollutant(Pollutant::SulphurDioxide) => (0.0, 1.0e-7),
            TextureVariable::Winds10m => (-25.0, 25.0),
        };
        ReferenceRange { min, max }
    }

    pub fn units(&self) -> &'static str {
        match self {
            TextureVariable::Pollutant(_) => CONCENTRATION_UNITS,
            TextureVariable::Winds10m => "m s**-1",
        }
    }

    /// Grid fields feeding the image channels, in channel order.
    pub fn fields(&self) -> Vec<GridField> {
        match self {
            TextureVariable::Pollutant(p) => vec![GridField::for_pollutant(*p)],
            TextureVariable::Winds10m => vec![GridField::WindU10, GridField::WindV10],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_byte_clips() {
        let range = TextureVariable::Winds10m.range();
        assert_eq!(range.to_byte(-25.0), (0, false));
        assert_eq!(range.to_byte(25.0), (255, false));
        assert_eq!(range.to_byte(0.0), (128, false));
        assert_eq!(range.to_byte(-40.0), (0, true));
        assert_eq!(range.to_byte(90.0), (255, true));
        assert_eq!(range.to_byte(f32::NAN), (0, false));
    }

    #[test]
    fn test_names() {
        let names: Vec<&str> = TextureVariable::all().iter().map(|v| v.name()).collect();
        assert_eq!(names, vec!["no2", "o3", "pm10", "pm2_5", "so2", "winds_10m"]);
    }

    #[test]
    fn test_wind_has_two_fields() {
        assert_eq!(TextureVariable::Winds10m.fields().len(), 2);
        assert_eq!(
            TextureVariable::Pollutant(Pollutant::Ozone).fields(),
            vec![GridField::Ozone]
        );
    }
}
