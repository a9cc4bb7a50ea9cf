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

//! Phase schedule and the supervisor around it.

use std::ops::ControlFlow;
use std::panic::{self, AssertUnwindSafe};
use std::thread;
use std::time::Duration;

use chrono::{DateTime, Local};

use crate::config::DEFAULT_PHASE_SECS;
use crate::error::ConfigError;
use crate::notify::NotificationService;
use crate::policy::panic_message;

/// Mailed before every restart after a failure no stage caught.
pub const HEARTBEAT_MESSAGE: &str =
    "something is wrong with the monitor, and no other stage caught the error";

/// One step of the repeating period: run a cycle, then idle for `duration`.
#[derive(Debug, Clone, PartialEq)]
pub struct Phase {
    pub name: String,
    /// Send the summary mail at the end of the cycle.
    pub summary: bool,
    pub duration: Duration,
}

impl Phase {
    pub fn new<S: Into<String>>(name: S, summary: bool, duration: Duration) -> Phase {
        Phase {
            name: name.into(),
            summary,
            duration,
        }
    }

    /// Half an hour: report and sleep 15 minutes, check and sleep 15 minutes.
    pub fn default_period() -> Vec<Phase> {
        let quarter = Duration::from_secs(DEFAULT_PHASE_SECS);
        vec![Phase::new("report", true, quarter), Phase::new("check", false, quarter)]
    }
}

/// Something that runs one pipeline cycle.
pub trait Cycle {
    fn run_cycle(&self, phase: &Phase);
}

/// Waits between phases. `Break` stops the schedule.
pub trait Sleeper {
    fn sleep(&mut self, duration: Duration) -> ControlFlow<()>;
}

/// Blocks the thread. Never asks to stop; an operator interrupt ends the
/// process directly.
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&mut self, duration: Duration) -> ControlFlow<()> {
        thread::sleep(duration);
        ControlFlow::Continue(())
    }
}

pub struct Scheduler {
    phases: Vec<Phase>,
}

impl Scheduler {
    pub fn new(phases: Vec<Phase>) -> Result<Scheduler, ConfigError> {
        if phases.is_empty() {
            return Err(ConfigError::NoPhases);
        }
        Ok(Scheduler { phases })
    }

    pub fn phases(&self) -> &[Phase] {
        &self.phases
    }

    /// Runs the phases in order, forever. Only returns once the sleeper
    /// breaks. There is no drift correction: a phase lasts its cycle plus
    /// its duration.
    pub fn run<C, S>(&self, cycle: &C, sleeper: &mut S)
    where
        C: Cycle + ?Sized,
        S: Sleeper + ?Sized,
    {
        loop {
            for phase in &self.phases {
                info!("Starting phase '{}'", phase.name);
                cycle.run_cycle(phase);
                match wake_time(phase.duration) {
                    Some(wake) => info!(
                        "Phase '{}' done, sleeping {}s until {}",
                        phase.name,
                        phase.duration.as_secs(),
                        wake.format("%H:%M:%S")
                    ),
                    None => info!("Phase '{}' done, sleeping {}s", phase.name, phase.duration.as_secs()),
                }
                if sleeper.sleep(phase.duration).is_break() {
                    return;
                }
            }
        }
    }
}

/// Wall-clock time `duration` from now, if the calendar can represent it.
fn wake_time(duration: Duration) -> Option<DateTime<Local>> {
    let idle = chrono::Duration::from_std(duration).ok()?;
    Local::now().checked_add_signed(idle)
}

/// Restart policy for the whole schedule: unlimited retries with a fixed
/// delay.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub delay: Duration,
}

pub struct Supervisor<'a> {
    scheduler: &'a Scheduler,
    policy: RetryPolicy,
    notifier: &'a NotificationService,
}

impl<'a> Supervisor<'a> {
    pub fn new(scheduler: &'a Scheduler, policy: RetryPolicy, notifier: &'a NotificationService) -> Supervisor<'a> {
        Supervisor {
            scheduler,
            policy,
            notifier,
        }
    }

    /// Runs the schedule, restarting it after any panic that escapes a
    /// cycle. A failure is mailed with its description unless it repeats the
    /// previous one. After the retry delay the heartbeat message is mailed
    /// and the schedule starts over. Returns only when the sleeper breaks.
    pub fn run<C, S>(&self, cycle: &C, sleeper: &mut S)
    where
        C: Cycle + ?Sized,
        S: Sleeper + ?Sized,
    {
        let mut failures: u64 = 0;
        let mut last_failure: Option<String> = None;
        loop {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.scheduler.run(cycle, &mut *sleeper)));
            let payload = match outcome {
                Ok(()) => {
                    info!("Schedule stopped");
                    return;
                }
                Err(payload) => payload,
            };
            failures += 1;
            let description = panic_message(&*payload);
            error!(
                "{}: {} (failure #{}, restarting in {}s)",
                HEARTBEAT_MESSAGE,
                description,
                failures,
                self.policy.delay.as_secs()
            );
            if last_failure.as_deref() != Some(description.as_str()) {
                self.notifier
                    .send_mail(&format!("{}, with errorcode {}", HEARTBEAT_MESSAGE, description));
                last_failure = Some(description);
            }
            if sleeper.sleep(self.policy.delay).is_break() {
                return;
            }
            self.notifier.send_mail(HEARTBEAT_MESSAGE);
        }
    }
}
