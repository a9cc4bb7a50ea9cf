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

//! The two notification sinks: e-mail for summaries and error reports,
//! voice calls for escalations.

use std::fmt::{self, Write};

use crate::datasink::{Mailer, VoiceCall, VoiceCaller};
use crate::dto::{AlertEvent, AmbientSample, Reading, TemperatureSet, UNAVAILABLE};
use crate::error::CallError;
use crate::policy::{Stage, StageGuard};

pub struct NotificationService {
    mailer: Box<dyn Mailer>,
    caller: Box<dyn VoiceCaller>,
    origin: String,
    destination: String,
}

impl NotificationService {
    pub fn new<O, D>(mailer: Box<dyn Mailer>, caller: Box<dyn VoiceCaller>, origin: O, destination: D) -> NotificationService
    where
        O: Into<String>,
        D: Into<String>,
    {
        NotificationService {
            mailer,
            caller,
            origin: origin.into(),
            destination: destination.into(),
        }
    }

    /// Mails `body`, which doubles as the subject. This is the terminal
    /// sink: a failure is logged and nothing else.
    pub fn send_mail(&self, body: &str) {
        debug!("Sending mail: {}", body);
        StageGuard::new(self).isolate(Stage::SendMail, || self.mailer.send(body, body))
    }

    /// Calls the destination number and narrates the event. A failed call
    /// is reported by mail.
    pub fn send_alert_call(&self, event: &AlertEvent) {
        let call = VoiceCall {
            to: self.destination.clone(),
            from: self.origin.clone(),
            twiml: voice_script(event),
        };
        StageGuard::new(self).isolate(Stage::Escalate, || {
            self.caller.place_call(&call)?;
            info!("Placed alert call to {}: {}", self.destination, event.reason);
            Ok::<(), CallError>(())
        })
    }

    /// Renders the periodic summary mail. Returns empty text, after
    /// reporting, if the body cannot be built.
    pub fn format_summary_body(&self, ambient: &AmbientSample, temperatures: &TemperatureSet) -> String {
        StageGuard::new(self).isolate(Stage::Summarize, || summary_body(ambient, temperatures))
    }
}

/// `"current temperature between: 10.0 and 20.0. And ambient temp is 25.0
/// with a humidity of 50.0%."`
pub fn summary_body(ambient: &AmbientSample, temperatures: &TemperatureSet) -> Result<String, fmt::Error> {
    let mut body = String::new();
    write!(body, "current temperature between: {}.", temperatures.spoken())?;
    write!(
        body,
        " And ambient temp is {} with a humidity of {}.",
        ambient.temperature,
        humidity(&ambient.humidity)
    )?;
    Ok(body)
}

fn humidity(reading: &Reading) -> String {
    match reading.value() {
        Some(_) => format!("{}%", reading),
        None => UNAVAILABLE.to_owned(),
    }
}

/// TwiML for an alert call.
pub fn voice_script(event: &AlertEvent) -> String {
    let ambient = &event.frame.ambient;
    let speech = format!(
        "There is something wrong with the terrarium. The reason is {}. \
         Ambient temperature is {}, and humidity is {}, and temperatures are {}. \
         Go to the terrarium immediately.",
        event.reason,
        ambient.temperature,
        humidity(&ambient.humidity),
        event.frame.temperatures.spoken()
    );
    format!("<Response><Say>{}</Say></Response>", escape_xml(&speech))
}

fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
