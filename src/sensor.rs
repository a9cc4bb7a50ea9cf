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

//! One-wire temperature probes and the combined ambient probe.
//!
//! One-wire probes show up as directories on the w1 bus, named after the
//! family code (`28` for DS18B20) and serial number. Their `w1_slave` file
//! holds two lines, the second one ending in `t=<milli-celsius>`:
//!
//! ```text
//! 72 01 4b 46 7f ff 0e 10 57 : crc=57 YES
//! 72 01 4b 46 7f ff 0e 10 57 t=23125
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::{AmbientSettings, ProbeSettings};
use crate::datasink::AmbientProbe;
use crate::dto::{round2, AmbientSample, ProbeId, Reading, TemperatureSet};
use crate::error::SensorError;
use crate::policy::{Stage, StageGuard};

/// Whitespace separated field of the second record line holding the value.
const DATA_FIELD: usize = 9;
/// Length of the `t=` marker in front of the value.
const DATA_MARKER_LEN: usize = 2;
const MILLI: f64 = 1000.0;

pub struct SensorReader {
    bus_path: PathBuf,
    prefix: String,
    data_file: String,
    ambient: Box<dyn AmbientProbe>,
}

impl SensorReader {
    pub fn new(settings: &ProbeSettings, ambient: Box<dyn AmbientProbe>) -> SensorReader {
        SensorReader {
            bus_path: settings.bus_path.clone(),
            prefix: settings.prefix.clone(),
            data_file: settings.data_file.clone(),
            ambient,
        }
    }

    pub fn discover_probes(&self, guard: &StageGuard) -> Vec<ProbeId> {
        guard.isolate(Stage::DiscoverProbes, || self.try_discover_probes())
    }

    pub fn try_discover_probes(&self) -> Result<Vec<ProbeId>, SensorError> {
        let list_error = |source| SensorError::ListBus {
            path: self.bus_path.clone(),
            source,
        };
        let mut probes = Vec::new();
        for entry in fs::read_dir(&self.bus_path).map_err(list_error)? {
            let name = entry.map_err(list_error)?.file_name();
            let name = name.to_string_lossy();
            if name.starts_with(&self.prefix) {
                probes.push(ProbeId(name.into_owned()));
            }
        }
        probes.sort();
        debug!("Discovered {} probes: {:?}", probes.len(), probes);
        Ok(probes)
    }

    pub fn read_probe(&self, id: &ProbeId, guard: &StageGuard) -> Reading {
        guard.isolate(Stage::ReadProbe, || self.try_read_probe(id).map(Reading::measured))
    }

    pub fn try_read_probe(&self, id: &ProbeId) -> Result<f64, SensorError> {
        let path = self.bus_path.join(&id.0).join(&self.data_file);
        let record = fs::read_to_string(&path).map_err(|source| SensorError::Read {
            path: path.clone(),
            source,
        })?;
        parse_record(&path, &record)
    }

    /// Reads every probe. A probe that cannot be read contributes an
    /// unavailable reading; an empty probe list is a failure of its own.
    pub fn read_all_probes(&self, ids: &[ProbeId], guard: &StageGuard) -> TemperatureSet {
        let readings: Result<Vec<Reading>, SensorError> = if ids.is_empty() {
            Err(SensorError::NoProbes)
        } else {
            Ok(ids.iter().map(|id| self.read_probe(id, guard)).collect())
        };
        guard.settle(Stage::ReadAllProbes, readings.map(TemperatureSet::from_readings))
    }

    pub fn read_ambient(&self, guard: &StageGuard) -> AmbientSample {
        guard.isolate(Stage::ReadAmbient, || {
            self.ambient
                .sample()
                .map(|(temperature, humidity)| AmbientSample::new(round2(temperature), round2(humidity)))
        })
    }
}

/// Extracts the temperature in Celsius from a `w1_slave` record.
pub fn parse_record(path: &Path, record: &str) -> Result<f64, SensorError> {
    let malformed = |detail: String| SensorError::Malformed {
        path: path.to_path_buf(),
        detail,
    };
    let line = record
        .lines()
        .nth(1)
        .ok_or_else(|| malformed("missing second line".to_owned()))?;
    let field = line
        .split_whitespace()
        .nth(DATA_FIELD)
        .ok_or_else(|| malformed(format!("no data field in '{}'", line)))?;
    let raw = field
        .get(DATA_MARKER_LEN..)
        .ok_or_else(|| malformed(format!("data field '{}' too short", field)))?;
    let milli: i64 = raw
        .parse()
        .map_err(|e| malformed(format!("'{}': {}", raw, e)))?;
    Ok(milli as f64 / MILLI)
}

/// Combined probe driven by the kernel `dht11` IIO driver (DHT11/DHT22).
pub struct IioAmbientProbe {
    device_path: PathBuf,
}

impl IioAmbientProbe {
    pub fn new(settings: &AmbientSettings) -> IioAmbientProbe {
        IioAmbientProbe {
            device_path: settings.device_path.clone(),
        }
    }

    fn read_milli(&self, attribute: &str) -> Result<f64, SensorError> {
        let path = self.device_path.join(attribute);
        let raw = fs::read_to_string(&path).map_err(|source| SensorError::Read {
            path: path.clone(),
            source,
        })?;
        let milli: i64 = raw.trim().parse().map_err(|e| SensorError::Malformed {
            path: path.clone(),
            detail: format!("'{}': {}", raw.trim(), e),
        })?;
        Ok(milli as f64 / MILLI)
    }
}

impl AmbientProbe for IioAmbientProbe {
    fn sample(&self) -> Result<(f64, f64), SensorError> {
        let temperature = self.read_milli("in_temp_input")?;
        let humidity = self.read_milli("in_humidityrelative_input")?;
        Ok((temperature, humidity))
    }
}
