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

use std::cmp::Ordering;
use std::fmt;

use serde::Serialize;

/// Text used wherever a value could not be measured.
pub const UNAVAILABLE: &str = "unavailable";

/// A single value in Celsius (or percent, for humidity), or nothing if the
/// probe could not be read.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Reading(pub Option<f64>);

impl Reading {
    pub const UNAVAILABLE: Reading = Reading(None);

    pub fn measured(value: f64) -> Reading {
        Reading(Some(value))
    }

    pub fn value(&self) -> Option<f64> {
        self.0
    }

    pub fn is_measured(&self) -> bool {
        self.0.is_some()
    }

    fn ascending(&self, other: &Reading) -> Ordering {
        match (self.0, other.0) {
            (Some(a), Some(b)) => a.total_cmp(&b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    }
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.0 {
            Some(value) => write!(f, "{}", format_value(value)),
            None => f.write_str(UNAVAILABLE),
        }
    }
}

/// Renders a float the way the summary and voice texts expect: always with
/// a fractional part, so `20` reads as `20.0`.
pub fn format_value(value: f64) -> String {
    format!("{:?}", value)
}

/// Rounds to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Sample of the combined temperature/humidity probe.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AmbientSample {
    pub temperature: Reading,
    pub humidity: Reading,
}

impl AmbientSample {
    pub fn new(temperature: f64, humidity: f64) -> AmbientSample {
        AmbientSample {
            temperature: Reading::measured(temperature),
            humidity: Reading::measured(humidity),
        }
    }

    pub fn unavailable() -> AmbientSample {
        AmbientSample {
            temperature: Reading::UNAVAILABLE,
            humidity: Reading::UNAVAILABLE,
        }
    }
}

/// Probe readings of one cycle, measured values ascending and unavailable
/// readings trailing. Position is the only link back to a probe.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TemperatureSet(Vec<Reading>);

impl TemperatureSet {
    pub fn from_readings(mut readings: Vec<Reading>) -> TemperatureSet {
        readings.sort_by(Reading::ascending);
        TemperatureSet(readings)
    }

    pub fn from_values(values: &[f64]) -> TemperatureSet {
        TemperatureSet::from_readings(values.iter().map(|v| Reading::measured(*v)).collect())
    }

    /// Lowest measured value, i.e. the cool side of the enclosure.
    pub fn coolest(&self) -> Option<f64> {
        self.0.first().and_then(Reading::value)
    }

    pub fn iter(&self) -> std::slice::Iter<Reading> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `"t1 and t2 and ... tn"`, or `"no readings"` for an empty set.
    pub fn spoken(&self) -> String {
        if self.0.is_empty() {
            return "no readings".to_owned();
        }
        self.0
            .iter()
            .map(Reading::to_string)
            .collect::<Vec<_>>()
            .join(" and ")
    }
}

/// Everything sampled in one cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryFrame {
    pub ambient: AmbientSample,
    pub temperatures: TemperatureSet,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlertEvent {
    pub reason: String,
    pub frame: TelemetryFrame,
}

/// Name of a one-wire probe directory on the bus, e.g. `28-0316a2794aff`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProbeId(pub String);

impl fmt::Display for ProbeId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}
