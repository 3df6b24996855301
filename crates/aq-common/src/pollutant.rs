//! The closed set of pollutants handled by the pipeline.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Mass concentration unit used for every persisted pollutant value.
pub const MICROGRAMS_PER_CUBIC_METRE: &str = "µg/m³";

/// A pollutant tracked by both the forecast and in-situ pipelines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Pollutant {
    #[serde(rename = "no2")]
    NitrogenDioxide,
    #[serde(rename = "o3")]
    Ozone,
    #[serde(rename = "pm10")]
    Pm10,
    #[serde(rename = "pm2_5")]
    Pm2_5,
    #[serde(rename = "so2")]
    SulphurDioxide,
}

impl Pollutant {
    pub const ALL: [Pollutant; 5] = [
        Pollutant::NitrogenDioxide,
        Pollutant::Ozone,
        Pollutant::Pm10,
        Pollutant::Pm2_5,
        Pollutant::SulphurDioxide,
    ];

    /// Canonical field name used in persisted documents and texture paths.
    pub fn field_name(&self) -> &'static str {
        match self {
            Pollutant::NitrogenDioxide => "no2",
            Pollutant::Ozone => "o3",
            Pollutant::Pm10 => "pm10",
            Pollutant::Pm2_5 => "pm2_5",
            Pollutant::SulphurDioxide => "so2",
        }
    }

    /// Molar mass in g/mol. Particulates have none and cannot be converted
    /// from volumetric units.
    pub fn molecular_weight(&self) -> Option<f64> {
        match self {
            Pollutant::NitrogenDioxide => Some(46.0055),
            Pollutant::Ozone => Some(48.0),
            Pollutant::SulphurDioxide => Some(64.066),
            Pollutant::Pm10 | Pollutant::Pm2_5 => None,
        }
    }

    /// Map an OpenAQ parameter name onto a pollutant.
    pub fn from_openaq_parameter(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "no2" => Some(Pollutant::NitrogenDioxide),
            "o3" => Some(Pollutant::Ozone),
            "pm10" => Some(Pollutant::Pm10),
            "pm25" | "pm2.5" | "pm2_5" => Some(Pollutant::Pm2_5),
            "so2" => Some(Pollutant::SulphurDioxide),
            _ => None,
        }
    }
}

impl fmt::Display for Pollutant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.field_name())
    }
}

impl FromStr for Pollutant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Pollutant::ALL
            .into_iter()
            .find(|p| p.field_name() == s)
            .ok_or_else(|| format!("Unknown pollutant: {}", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_names_round_trip() {
        for pollutant in Pollutant::ALL {
            assert_eq!(pollutant.field_name().parse::<Pollutant>(), Ok(pollutant));
        }
        assert!("co".parse::<Pollutant>().is_err());
    }

    #[test]
    fn test_openaq_parameter_names() {
        assert_eq!(Pollutant::from_openaq_parameter("pm25"), Some(Pollutant::Pm2_5));
        assert_eq!(Pollutant::from_openaq_parameter("O3"), Some(Pollutant::Ozone));
        assert_eq!(Pollutant::from_openaq_parameter("co"), None);
    }

    #[test]
    fn test_serde_uses_field_name() {
        let json = serde_json::to_string(&Pollutant::Pm2_5).unwrap();
        assert_eq!(json, "\"pm2_5\"");
    }
}
