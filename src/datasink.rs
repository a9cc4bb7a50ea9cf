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

//! Contracts of the external collaborators. Concrete clients live in
//! [`transport`](crate::transport); tests plug in their own.

use crate::error::{CallError, MailError, PublishError, SensorError};

/// An encoded telemetry frame, ready to be forwarded.
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryMessage {
    pub body: String,
    pub content_type: &'static str,
    pub content_encoding: &'static str,
}

/// A voice call narrating `twiml`.
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceCall {
    pub to: String,
    pub from: String,
    pub twiml: String,
}

pub trait TelemetryClient {
    ///
    /// Forward one message to the cloud ingestion endpoint.
    ///
    fn send_message(&self, message: &TelemetryMessage) -> Result<(), PublishError>;
}

pub trait Mailer {
    ///
    /// Deliver a plain-text message to the fixed recipient.
    ///
    fn send(&self, subject: &str, body: &str) -> Result<(), MailError>;
}

pub trait VoiceCaller {
    fn place_call(&self, call: &VoiceCall) -> Result<(), CallError>;
}

/// The combined temperature/humidity probe.
pub trait AmbientProbe {
    ///
    /// Returns `(temperature °C, relative humidity %)`, unrounded.
    ///
    fn sample(&self) -> Result<(f64, f64), SensorError>;
}
