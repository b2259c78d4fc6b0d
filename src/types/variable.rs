//! Names of the physical quantities flowing through the pipeline: the raw
//! variables stored in the reanalysis file, and the converted measures exposed
//! in output tables.

use std::fmt;

/// A variable as stored in the ERA5 single-levels file, in its source units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RawVariable {
    /// 2 metre temperature, Kelvin.
    Temperature,
    /// Total precipitation, metres.
    Precipitation,
    /// Mean sea level pressure, Pascal.
    Pressure,
    /// 2 metre dewpoint temperature, Kelvin.
    Dewpoint,
}

impl RawVariable {
    pub const ALL: [RawVariable; 4] = [
        RawVariable::Temperature,
        RawVariable::Precipitation,
        RawVariable::Pressure,
        RawVariable::Dewpoint,
    ];

    /// Short name of the variable inside the NetCDF file.
    pub fn short_name(&self) -> &'static str {
        match self {
            RawVariable::Temperature => "t2m",
            RawVariable::Precipitation => "tp",
            RawVariable::Pressure => "msl",
            RawVariable::Dewpoint => "d2m",
        }
    }

    /// Name used for this variable in a Copernicus data request.
    pub fn request_name(&self) -> &'static str {
        match self {
            RawVariable::Temperature => "2m_temperature",
            RawVariable::Precipitation => "total_precipitation",
            RawVariable::Pressure => "mean_sea_level_pressure",
            RawVariable::Dewpoint => "2m_dewpoint_temperature",
        }
    }

    pub fn units(&self) -> &'static str {
        match self {
            RawVariable::Temperature | RawVariable::Dewpoint => "K",
            RawVariable::Precipitation => "m",
            RawVariable::Pressure => "Pa",
        }
    }
}

impl fmt::Display for RawVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.short_name())
    }
}

/// A converted quantity, named in the target (Portuguese) vocabulary of the
/// downstream tables.
///
/// The declaration order is the column order of the output tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Measure {
    /// Air temperature, degrees Celsius.
    Temp,
    /// Precipitation, millimetres.
    Precip,
    /// Sea level pressure, atmospheres.
    Pressao,
    /// Relative humidity, percent.
    Umid,
}

impl Measure {
    pub const ALL: [Measure; 4] = [Measure::Temp, Measure::Precip, Measure::Pressao, Measure::Umid];

    pub fn column_name(&self) -> &'static str {
        match self {
            Measure::Temp => "temp",
            Measure::Precip => "precip",
            Measure::Pressao => "pressao",
            Measure::Umid => "umid",
        }
    }

    pub fn units(&self) -> &'static str {
        match self {
            Measure::Temp => "degC",
            Measure::Precip => "mm",
            Measure::Pressao => "atm",
            Measure::Umid => "pct",
        }
    }

    pub fn long_name(&self) -> &'static str {
        match self {
            Measure::Temp => "Temperatura",
            Measure::Precip => "Precipitação",
            Measure::Pressao => "Pressão ao Nível do Mar",
            Measure::Umid => "Umidade Relativa do Ar",
        }
    }

    /// Column names of the daily statistics for this measure, `[min, med, max]`.
    pub fn daily_columns(&self) -> [String; 3] {
        let name = self.column_name();
        [
            format!("{name}_min"),
            format!("{name}_med"),
            format!("{name}_max"),
        ]
    }
}

impl fmt::Display for Measure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.column_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_daily_columns_follow_output_order() {
        let columns: Vec<String> = Measure::ALL
            .iter()
            .flat_map(|m| m.daily_columns())
            .collect();
        assert_eq!(
            columns,
            [
                "temp_min",
                "temp_med",
                "temp_max",
                "precip_min",
                "precip_med",
                "precip_max",
                "pressao_min",
                "pressao_med",
                "pressao_max",
                "umid_min",
                "umid_med",
                "umid_max",
            ]
        );
    }
}
