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

//! In-memory stand-ins for the mail, voice and telemetry clients, plus a
//! fake one-wire bus in a temporary directory.

#![allow(dead_code)]

use std::cell::RefCell;
use std::fs;
use std::ops::ControlFlow;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;

use tempfile::TempDir;

use terrarium_monitor::alert::{AlertEvaluator, Thresholds};
use terrarium_monitor::config::ProbeSettings;
use terrarium_monitor::datasink::{AmbientProbe, Mailer, TelemetryClient, TelemetryMessage, VoiceCall, VoiceCaller};
use terrarium_monitor::error::{CallError, MailError, PublishError, SensorError};
use terrarium_monitor::notify::NotificationService;
use terrarium_monitor::schedule::Sleeper;
use terrarium_monitor::sensor::SensorReader;
use terrarium_monitor::telemetry::TelemetryPublisher;
use terrarium_monitor::Monitor;

pub const ORIGIN: &str = "+3100000001";
pub const DESTINATION: &str = "+3100000002";

pub type Shared<T> = Rc<RefCell<Vec<T>>>;

pub struct RecordingMailer {
    sent: Shared<String>,
    fail: bool,
}

impl Mailer for RecordingMailer {
    fn send(&self, subject: &str, body: &str) -> Result<(), MailError> {
        assert_eq!(subject, body, "subject must equal body");
        self.sent.borrow_mut().push(body.to_owned());
        if self.fail {
            return Err(MailError::Build("mail server unreachable".to_owned()));
        }
        Ok(())
    }
}

pub struct RecordingCaller {
    calls: Shared<VoiceCall>,
    fail: bool,
}

impl VoiceCaller for RecordingCaller {
    fn place_call(&self, call: &VoiceCall) -> Result<(), CallError> {
        self.calls.borrow_mut().push(call.clone());
        if self.fail {
            return Err(CallError::Rejected {
                status: 401,
                body: "bad token".to_owned(),
            });
        }
        Ok(())
    }
}

pub struct RecordingTelemetry {
    messages: Shared<TelemetryMessage>,
    fail: bool,
    panics: bool,
}

impl TelemetryClient for RecordingTelemetry {
    fn send_message(&self, message: &TelemetryMessage) -> Result<(), PublishError> {
        if self.panics {
            panic!("connection pool poisoned");
        }
        if self.fail {
            return Err(PublishError::Rejected { status: 503 });
        }
        self.messages.borrow_mut().push(message.clone());
        Ok(())
    }
}

pub enum FakeAmbient {
    Fixed(f64, f64),
    Broken,
    Panics(&'static str),
}

impl AmbientProbe for FakeAmbient {
    fn sample(&self) -> Result<(f64, f64), SensorError> {
        match *self {
            FakeAmbient::Fixed(t, h) => Ok((t, h)),
            FakeAmbient::Broken => Err(SensorError::Malformed {
                path: PathBuf::from("in_temp_input"),
                detail: "checksum mismatch".to_owned(),
            }),
            FakeAmbient::Panics(message) => panic!("{}", message),
        }
    }
}

/// Breaks after `remaining` sleeps, recording every requested duration.
pub struct StopAfter {
    pub remaining: usize,
    pub slept: Vec<Duration>,
}

impl StopAfter {
    pub fn new(remaining: usize) -> StopAfter {
        StopAfter {
            remaining,
            slept: Vec::new(),
        }
    }
}

impl Sleeper for StopAfter {
    fn sleep(&mut self, duration: Duration) -> ControlFlow<()> {
        self.slept.push(duration);
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    }
}

/// A `w1_slave` record carrying `milli` milli-degrees.
pub fn w1_record(milli: i64) -> String {
    format!(
        "72 01 4b 46 7f ff 0e 10 57 : crc=57 YES\n72 01 4b 46 7f ff 0e 10 57 t={}\n",
        milli
    )
}

pub struct Harness {
    pub monitor: Monitor,
    pub mails: Shared<String>,
    pub calls: Shared<VoiceCall>,
    pub telemetry: Shared<TelemetryMessage>,
    pub bus: TempDir,
}

impl Harness {
    pub fn builder() -> HarnessBuilder {
        HarnessBuilder {
            probes: Vec::new(),
            ambient: FakeAmbient::Fixed(25.0, 50.0),
            missing_bus: false,
            fail_publish: false,
            panic_publish: false,
            fail_call: false,
            fail_mail: false,
        }
    }

    pub fn mails(&self) -> Vec<String> {
        self.mails.borrow().clone()
    }

    pub fn calls(&self) -> Vec<VoiceCall> {
        self.calls.borrow().clone()
    }

    pub fn telemetry_bodies(&self) -> Vec<String> {
        self.telemetry.borrow().iter().map(|m| m.body.clone()).collect()
    }
}

pub struct HarnessBuilder {
    probes: Vec<(String, String)>,
    ambient: FakeAmbient,
    missing_bus: bool,
    fail_publish: bool,
    panic_publish: bool,
    fail_call: bool,
    fail_mail: bool,
}

impl HarnessBuilder {
    pub fn probe(mut self, id: &str, milli: i64) -> Self {
        self.probes.push((id.to_owned(), w1_record(milli)));
        self
    }

    pub fn broken_probe(mut self, id: &str) -> Self {
        self.probes.push((id.to_owned(), "72 01 4b 46 7f ff 0e 10 57 : crc=57 NO\n".to_owned()));
        self
    }

    pub fn ambient(mut self, ambient: FakeAmbient) -> Self {
        self.ambient = ambient;
        self
    }

    pub fn missing_bus(mut self) -> Self {
        self.missing_bus = true;
        self
    }

    pub fn fail_publish(mut self) -> Self {
        self.fail_publish = true;
        self
    }

    pub fn panic_publish(mut self) -> Self {
        self.panic_publish = true;
        self
    }

    pub fn fail_call(mut self) -> Self {
        self.fail_call = true;
        self
    }

    pub fn fail_mail(mut self) -> Self {
        self.fail_mail = true;
        self
    }

    pub fn build(self) -> Harness {
        let bus = tempfile::tempdir().expect("temp dir");
        for (id, record) in &self.probes {
            let dir = bus.path().join(id);
            fs::create_dir(&dir).expect("probe dir");
            fs::write(dir.join("w1_slave"), record).expect("probe record");
        }
        // The bus master sits next to the probes and must be ignored.
        fs::create_dir(bus.path().join("w1_bus_master1")).expect("bus master dir");

        let bus_path = if self.missing_bus {
            bus.path().join("gone")
        } else {
            bus.path().to_path_buf()
        };
        let probe_settings = ProbeSettings {
            bus_path,
            ..ProbeSettings::default()
        };

        let mails: Shared<String> = Rc::default();
        let calls: Shared<VoiceCall> = Rc::default();
        let telemetry: Shared<TelemetryMessage> = Rc::default();

        let notifier = NotificationService::new(
            Box::new(RecordingMailer {
                sent: mails.clone(),
                fail: self.fail_mail,
            }),
            Box::new(RecordingCaller {
                calls: calls.clone(),
                fail: self.fail_call,
            }),
            ORIGIN,
            DESTINATION,
        );
        let monitor = Monitor::new(
            SensorReader::new(&probe_settings, Box::new(self.ambient)),
            TelemetryPublisher::new(Box::new(RecordingTelemetry {
                messages: telemetry.clone(),
                fail: self.fail_publish,
                panics: self.panic_publish,
            })),
            AlertEvaluator::new(Thresholds::default()),
            notifier,
        );

        Harness {
            monitor,
            mails,
            calls,
            telemetry,
            bus,
        }
    }
}
