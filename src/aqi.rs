// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Air Quality Index calculation.
//!
//! The index is derived from three pollutant concentrations using
//! piecewise-linear breakpoint tables. Each pollutant is mapped to its own
//! sub-index and the worst one wins.
//!
//! # Examples
//!
//! ```
//! use blueair_lib::aqi;
//!
//! assert_eq!(aqi::calculate(Some(35.4), Some(0.0), Some(0.0)), Some(100));
//! assert_eq!(aqi::calculate(None, None, None), None);
//! ```

/// Number of breakpoint segments per pollutant.
const SEGMENTS: usize = 6;

/// One pollutant's breakpoint table.
struct Breakpoints {
    aqi_lo: [f64; SEGMENTS],
    aqi_hi: [f64; SEGMENTS],
    conc_lo: [f64; SEGMENTS],
    conc_hi: [f64; SEGMENTS],
}

const AQI_LO: [f64; SEGMENTS] = [0.0, 51.0, 101.0, 151.0, 201.0, 301.0];
const AQI_HI: [f64; SEGMENTS] = [50.0, 100.0, 150.0, 200.0, 300.0, 500.0];

const PM2_5: Breakpoints = Breakpoints {
    aqi_lo: AQI_LO,
    aqi_hi: AQI_HI,
    conc_lo: [0.0, 9.1, 35.5, 55.5, 125.5, 225.5],
    conc_hi: [9.0, 35.4, 55.4, 125.4, 225.4, 325.4],
};

const PM10: Breakpoints = Breakpoints {
    aqi_lo: AQI_LO,
    aqi_hi: AQI_HI,
    conc_lo: [0.0, 55.0, 155.0, 255.0, 355.0, 425.0],
    conc_hi: [54.0, 154.0, 254.0, 354.0, 424.0, 604.0],
};

const VOC: Breakpoints = Breakpoints {
    aqi_lo: AQI_LO,
    aqi_hi: AQI_HI,
    conc_lo: [0.0, 221.0, 661.0, 1431.0, 2201.0, 3301.0],
    conc_hi: [220.0, 660.0, 1430.0, 2200.0, 3300.0, 5500.0],
};

/// A pollutant that contributes to the AQI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pollutant {
    /// Fine particulate matter (µg/m³).
    Pm2_5,
    /// Coarse particulate matter (µg/m³).
    Pm10,
    /// Total volatile organic compounds (ppb).
    Voc,
}

impl Pollutant {
    /// All pollutants, in table order.
    pub const ALL: [Self; 3] = [Self::Pm2_5, Self::Pm10, Self::Voc];

    /// Returns the sensor name this pollutant is reported under.
    #[must_use]
    pub fn sensor_name(self) -> &'static str {
        match self {
            Self::Pm2_5 => "pm2_5",
            Self::Pm10 => "pm10",
            Self::Voc => "voc",
        }
    }

    /// Returns `true` if the given sensor name feeds the AQI.
    #[must_use]
    pub fn is_aqi_input(sensor: &str) -> bool {
        Self::ALL.iter().any(|p| p.sensor_name() == sensor)
    }

    fn breakpoints(self) -> &'static Breakpoints {
        match self {
            Self::Pm2_5 => &PM2_5,
            Self::Pm10 => &PM10,
            Self::Voc => &VOC,
        }
    }
}

/// Computes the sub-index of a single pollutant.
///
/// PM2.5 concentrations are rounded to one decimal place before lookup.
/// Concentrations that fall outside every segment (negative values, values
/// above the last segment or inside the gap between two segments) yield 0.
#[must_use]
pub fn pollutant_index(pollutant: Pollutant, concentration: f64) -> u16 {
    let value = match pollutant {
        Pollutant::Pm2_5 => (concentration * 10.0).round() / 10.0,
        Pollutant::Pm10 | Pollutant::Voc => concentration,
    };

    let table = pollutant.breakpoints();
    let Some(i) = (0..SEGMENTS).find(|&i| table.conc_lo[i] <= value && value <= table.conc_hi[i])
    else {
        return 0;
    };

    let slope = (table.aqi_hi[i] - table.aqi_lo[i]) / (table.conc_hi[i] - table.conc_lo[i]);
    let index = (slope * (value - table.conc_lo[i]) + table.aqi_lo[i]).round();

    // Bounded by the table: 0 <= index <= 500
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let index = index as u16;
    index
}

/// Computes the overall AQI from the three pollutant readings.
///
/// Returns `None` when none of the readings has been observed. Missing
/// readings count as 0 otherwise.
#[must_use]
pub fn calculate(pm2_5: Option<f64>, pm10: Option<f64>, voc: Option<f64>) -> Option<u16> {
    if pm2_5.is_none() && pm10.is_none() && voc.is_none() {
        return None;
    }

    Pollutant::ALL
        .into_iter()
        .zip([pm2_5, pm10, voc])
        .map(|(pollutant, value)| pollutant_index(pollutant, value.unwrap_or(0.0)))
        .max()
}
