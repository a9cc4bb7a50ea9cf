// Copyright 2016 Claus Matzinger
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//    http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use serde::Deserialize;

use crate::dto::{format_value, AlertEvent, TelemetryFrame};
use crate::error::EvaluationError;
use crate::notify::NotificationService;
use crate::policy::{Stage, StageGuard};

/// Safety limits in °C. Values exactly on a limit are fine.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub ambient_high: f64,
    pub ambient_low: f64,
    pub cool_side_high: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Thresholds {
            ambient_high: 40.0,
            ambient_low: 20.0,
            cool_side_high: 45.0,
        }
    }
}

/// Checks a frame against [`Thresholds`]. Nothing carries over between
/// cycles.
pub struct AlertEvaluator {
    thresholds: Thresholds,
}

impl AlertEvaluator {
    pub fn new(thresholds: Thresholds) -> AlertEvaluator {
        AlertEvaluator { thresholds }
    }

    /// Returns one event per rule that fired: at most one ambient event and
    /// one cool-side event.
    pub fn evaluate(&self, frame: &TelemetryFrame) -> Result<Vec<AlertEvent>, EvaluationError> {
        check_finite("ambient temperature", frame.ambient.temperature.value())?;
        for reading in frame.temperatures.iter() {
            check_finite("probe temperature", reading.value())?;
        }

        let mut reasons = Vec::new();
        match frame.ambient.temperature.value() {
            None => warn!("The ambient probe gave no reading and needs to be reset"),
            Some(ambient) if ambient == 0.0 => {
                warn!("The ambient probe needs to be reset: {}", format_value(ambient))
            }
            Some(ambient) if ambient > self.thresholds.ambient_high => {
                warn!("Ambient temperature is too high: {}", format_value(ambient));
                reasons.push(format!("ambient temperature too high, value {}", format_value(ambient)));
            }
            Some(ambient) if ambient < self.thresholds.ambient_low => {
                warn!("Ambient temperature is too low: {}", format_value(ambient));
                reasons.push(format!("ambient temperature too low, value {}", format_value(ambient)));
            }
            Some(ambient) => info!("Ambient temperature is sufficient: {}", format_value(ambient)),
        }

        match frame.temperatures.coolest() {
            None => warn!("No probe temperature to check the cool side against"),
            Some(coolest) if coolest > self.thresholds.cool_side_high => {
                warn!("Temperature of the cool side is too high: {}", format_value(coolest));
                reasons.push(format!("cool-side sensor too high, value {}", format_value(coolest)));
            }
            Some(_) => info!("Temperature of the cool side is sufficient"),
        }

        Ok(reasons
            .into_iter()
            .map(|reason| AlertEvent {
                reason,
                frame: frame.clone(),
            })
            .collect())
    }

    /// Evaluates the frame and places one call per event.
    pub fn check_and_alert(&self, frame: &TelemetryFrame, notifier: &NotificationService, guard: &StageGuard) {
        let events = guard.isolate(Stage::Evaluate, || self.evaluate(frame));
        for event in &events {
            notifier.send_alert_call(event);
        }
    }
}

fn check_finite(field: &str, value: Option<f64>) -> Result<(), EvaluationError> {
    match value {
        Some(v) if !v.is_finite() => Err(EvaluationError::NonFinite {
            field: field.to_owned(),
            value: v,
        }),
        _ => Ok(()),
    }
}
