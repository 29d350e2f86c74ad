// src/alert.rs
//
// Threshold alerting on extracted readings.

use std::fmt;

use serde::Serialize;

use crate::extract::Reading;

/// Default alert threshold in volts.
pub const DEFAULT_THRESHOLD: f64 = 4.0;

/// True iff `reading.value` is strictly above `threshold`.
pub fn check(reading: &Reading, threshold: f64) -> bool {
    reading.value > threshold
}

/// A reading that crossed the threshold. Display gives the console message.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Alert {
    pub field_name: String,
    pub value: f64,
    pub unit: String,
    pub threshold: f64,
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ALERTA: {} {:.2} {} supera el umbral de {:.2} {}",
            self.field_name, self.value, self.unit, self.threshold, self.unit
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Alerter {
    threshold: f64,
}

impl Alerter {
    pub fn new(threshold: f64) -> Self {
        Alerter { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn evaluate(&self, reading: &Reading) -> Option<Alert> {
        if !check(reading, self.threshold) {
            return None;
        }
        Some(Alert {
            field_name: reading.field_name.clone(),
            value: reading.value,
            unit: reading.unit.clone(),
            threshold: self.threshold,
        })
    }
}

impl Default for Alerter {
    fn default() -> Self {
        Alerter::new(DEFAULT_THRESHOLD)
    }
}
