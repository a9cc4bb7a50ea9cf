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

//! Degradation policy.
//!
//! Every stage of a cycle returns a `Result`. [`StageGuard::settle`] turns a
//! failed result into the stage's fallback value and, where the table says
//! so, mails the failure to the operator. [`StageGuard::isolate`] does the
//! same for a call into a collaborator, treating a panic as a failure of
//! that stage. The monitor never stops because a stage failed.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use crate::dto::{AmbientSample, Reading, TemperatureSet};
use crate::error::{StageError, StageFailure};
use crate::notify::NotificationService;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    DiscoverProbes,
    ReadProbe,
    ReadAllProbes,
    ReadAmbient,
    Publish,
    Evaluate,
    Escalate,
    Summarize,
    SendMail,
}

/// Value a stage degrades to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fallback {
    NoProbes,
    UnavailableReading,
    EmptyTemperatureSet,
    UnavailableSample,
    Skip,
    NoEscalation,
    EmptyText,
}

impl fmt::Display for Fallback {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let text = match *self {
            Fallback::NoProbes => "no probes",
            Fallback::UnavailableReading => "an unavailable reading",
            Fallback::EmptyTemperatureSet => "an empty temperature set",
            Fallback::UnavailableSample => "an unavailable ambient sample",
            Fallback::Skip => "skipping the stage",
            Fallback::NoEscalation => "no escalation",
            Fallback::EmptyText => "empty text",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct StagePolicy {
    pub stage: Stage,
    pub fallback: Fallback,
    /// Mail the failure. Only the mail sink itself must never do this.
    pub notify: bool,
    /// Leading text of the operator report.
    pub report: &'static str,
}

pub const DEGRADATION_POLICY: [StagePolicy; 9] = [
    StagePolicy {
        stage: Stage::DiscoverProbes,
        fallback: Fallback::NoProbes,
        notify: true,
        report: "the monitor was unable to list probe directories",
    },
    StagePolicy {
        stage: Stage::ReadProbe,
        fallback: Fallback::UnavailableReading,
        notify: true,
        report: "a temperature probe cannot be read, returning an unavailable reading",
    },
    StagePolicy {
        stage: Stage::ReadAllProbes,
        fallback: Fallback::EmptyTemperatureSet,
        notify: true,
        report: "the list of temperatures cannot be created, returning an empty list",
    },
    StagePolicy {
        stage: Stage::ReadAmbient,
        fallback: Fallback::UnavailableSample,
        notify: true,
        report: "the ambient probe cannot be read, returning an unavailable sample",
    },
    StagePolicy {
        stage: Stage::Publish,
        fallback: Fallback::Skip,
        notify: true,
        report: "the monitor was unable to send telemetry",
    },
    StagePolicy {
        stage: Stage::Evaluate,
        fallback: Fallback::NoEscalation,
        notify: true,
        report: "the monitor was unable to do one of the checks",
    },
    StagePolicy {
        stage: Stage::Escalate,
        fallback: Fallback::Skip,
        notify: true,
        report: "the monitor was unable to place an alert call",
    },
    StagePolicy {
        stage: Stage::Summarize,
        fallback: Fallback::EmptyText,
        notify: true,
        report: "the monitor was unable to create a needed e-mail body",
    },
    StagePolicy {
        stage: Stage::SendMail,
        fallback: Fallback::Skip,
        notify: false,
        report: "failure to send an e-mail",
    },
];

impl Stage {
    /// The table is ordered like the enum.
    pub fn policy(self) -> &'static StagePolicy {
        &DEGRADATION_POLICY[self as usize]
    }
}

/// Types a failed stage can fall back to.
pub trait Degradable {
    fn fallback() -> Self;

    /// Whether `fallback()` is the value the table names.
    fn degrades_to(fallback: Fallback) -> bool;
}

impl<T> Degradable for Vec<T> {
    fn fallback() -> Self {
        Vec::new()
    }

    fn degrades_to(fallback: Fallback) -> bool {
        matches!(fallback, Fallback::NoProbes | Fallback::NoEscalation)
    }
}

impl Degradable for Reading {
    fn fallback() -> Self {
        Reading::UNAVAILABLE
    }

    fn degrades_to(fallback: Fallback) -> bool {
        fallback == Fallback::UnavailableReading
    }
}

impl Degradable for AmbientSample {
    fn fallback() -> Self {
        AmbientSample::unavailable()
    }

    fn degrades_to(fallback: Fallback) -> bool {
        fallback == Fallback::UnavailableSample
    }
}

impl Degradable for TemperatureSet {
    fn fallback() -> Self {
        TemperatureSet::default()
    }

    fn degrades_to(fallback: Fallback) -> bool {
        fallback == Fallback::EmptyTemperatureSet
    }
}

impl Degradable for String {
    fn fallback() -> Self {
        String::new()
    }

    fn degrades_to(fallback: Fallback) -> bool {
        fallback == Fallback::EmptyText
    }
}

impl Degradable for () {
    fn fallback() -> Self {}

    fn degrades_to(fallback: Fallback) -> bool {
        fallback == Fallback::Skip
    }
}

/// Applies [`DEGRADATION_POLICY`], reporting through the mail sink.
pub struct StageGuard<'a> {
    notifier: &'a NotificationService,
}

impl<'a> StageGuard<'a> {
    pub fn new(notifier: &'a NotificationService) -> StageGuard<'a> {
        StageGuard { notifier }
    }

    pub fn settle<T, E>(&self, stage: Stage, result: Result<T, E>) -> T
    where
        T: Degradable,
        E: Into<StageError>,
    {
        debug_assert!(
            T::degrades_to(stage.policy().fallback),
            "{:?} does not degrade to {}",
            stage,
            stage.policy().fallback
        );
        match result {
            Ok(value) => value,
            Err(e) => {
                let failure = StageFailure::new(stage, e);
                let policy = stage.policy();
                if policy.notify {
                    error!("{} (degrading to {})", failure, policy.fallback);
                    self.notifier.send_mail(&failure.to_string());
                } else {
                    error!("{}. Not reporting by e-mail, this is the mail sink", failure);
                }
                T::fallback()
            }
        }
    }

    /// Runs `call` and settles its outcome. A panic inside `call` counts as
    /// a failure of `stage` and does not leave this function.
    pub fn isolate<T, E, F>(&self, stage: Stage, call: F) -> T
    where
        T: Degradable,
        E: Into<StageError>,
        F: FnOnce() -> Result<T, E>,
    {
        let result = match panic::catch_unwind(AssertUnwindSafe(call)) {
            Ok(result) => result.map_err(Into::into),
            Err(payload) => Err(StageError::Panicked(panic_message(&*payload))),
        };
        self.settle(stage, result)
    }
}

/// Text of a panic payload.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_owned()
    }
}
