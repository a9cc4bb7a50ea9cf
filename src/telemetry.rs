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

//! Cloud telemetry.
//!
//! The ingestion endpoint expects a flat JSON object:
//! `{"ambienttemp": 22.5, "humidity": 40.0, "temperature1": 30.0, ...}` with
//! one `temperatureN` entry per probe, in ascending order.

use std::io;

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::ser::Formatter;

use crate::datasink::{TelemetryClient, TelemetryMessage};
use crate::dto::TelemetryFrame;
use crate::error::PublishError;
use crate::policy::{Stage, StageGuard};

pub const CONTENT_TYPE: &str = "application/json";
pub const CONTENT_ENCODING: &str = "utf-8";

struct Payload<'a>(&'a TelemetryFrame);

impl<'a> Serialize for Payload<'a> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let frame = self.0;
        let mut map = serializer.serialize_map(Some(2 + frame.temperatures.len()))?;
        map.serialize_entry("ambienttemp", &frame.ambient.temperature)?;
        map.serialize_entry("humidity", &frame.ambient.humidity)?;
        for (i, reading) in frame.temperatures.iter().enumerate() {
            map.serialize_entry(&format!("temperature{}", i + 1), reading)?;
        }
        map.end()
    }
}

/// Separates entries with `", "` and keys from values with `": "`.
struct SpacedFormatter;

impl Formatter for SpacedFormatter {
    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(b": ")
    }
}

/// Serializes a frame into the ingestion wire format. Unavailable values
/// become `null`.
pub fn encode(frame: &TelemetryFrame) -> Result<TelemetryMessage, PublishError> {
    let mut buffer = Vec::new();
    let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, SpacedFormatter);
    Payload(frame).serialize(&mut serializer)?;
    // serde_json only ever emits valid UTF-8
    let body = String::from_utf8_lossy(&buffer).into_owned();
    Ok(TelemetryMessage {
        body,
        content_type: CONTENT_TYPE,
        content_encoding: CONTENT_ENCODING,
    })
}

pub struct TelemetryPublisher {
    client: Box<dyn TelemetryClient>,
}

impl TelemetryPublisher {
    pub fn new(client: Box<dyn TelemetryClient>) -> TelemetryPublisher {
        TelemetryPublisher { client }
    }

    pub fn publish(&self, frame: &TelemetryFrame, guard: &StageGuard) {
        guard.isolate(Stage::Publish, || self.try_publish(frame))
    }

    pub fn try_publish(&self, frame: &TelemetryFrame) -> Result<(), PublishError> {
        let message = encode(frame)?;
        info!("Sending message: {}", message.body);
        self.client.send_message(&message)?;
        info!("Message successfully sent to the ingestion endpoint");
        Ok(())
    }
}
