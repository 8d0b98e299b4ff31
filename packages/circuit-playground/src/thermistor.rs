//! Thermistor ADC to temperature conversion.
//!
//! The on-board thermistor sits in a voltage divider with a fixed series
//! resistor and is read through a 10-bit ADC. Resistance is recovered from the
//! ADC value, then converted with the simplified (beta) Steinhart-Hart
//! equation.

/// Analog channel the thermistor is wired to.
pub const THERMISTOR_CHANNEL: u8 = 0;

/// Series resistor of the divider, in ohms.
pub const SERIES_OHMS: f32 = 10_000.0;

/// Thermistor resistance at [`NOMINAL_C`], in ohms.
pub const NOMINAL_OHMS: f32 = 10_000.0;

/// Temperature at which the thermistor measures [`NOMINAL_OHMS`].
pub const NOMINAL_C: f32 = 25.0;

/// Beta coefficient of the thermistor.
pub const BETA: f32 = 3950.0;

/// Largest value produced by the 10-bit ADC.
pub const ADC_MAX: f32 = 1023.0;

const KELVIN_OFFSET: f32 = 273.15;

/// Converts a raw ADC reading to degrees Celsius.
///
/// A reading of zero has no physical meaning and yields `NaN`.
pub fn adc_to_celsius(raw: u16) -> f32 {
    if raw == 0 {
        return f32::NAN;
    }

    let resistance = (ADC_MAX * SERIES_OHMS) / raw as f32 - SERIES_OHMS;

    let mut steinhart = (resistance / NOMINAL_OHMS).ln();
    steinhart /= BETA;
    steinhart += 1.0 / (NOMINAL_C + KELVIN_OFFSET);
    steinhart = 1.0 / steinhart;
    steinhart - KELVIN_OFFSET
}
