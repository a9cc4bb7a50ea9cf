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

mod common;

use std::time::Duration;

use common::{FakeAmbient, Harness, StopAfter, DESTINATION, ORIGIN};
use terrarium_monitor::schedule::{Cycle, Phase};
use terrarium_monitor::Scheduler;

fn check_phase() -> Phase {
    Phase::new("check", false, Duration::from_secs(900))
}

fn report_phase() -> Phase {
    Phase::new("report", true, Duration::from_secs(900))
}

#[test]
fn full_period_runs_two_cycles_and_one_summary() {
    let harness = Harness::builder()
        .probe("28-000001", 30000)
        .probe("28-000002", 35000)
        .ambient(FakeAmbient::Fixed(22.5, 40.0))
        .build();
    let scheduler = Scheduler::new(Phase::default_period()).unwrap();
    let mut sleeper = StopAfter::new(2);

    scheduler.run(&harness.monitor, &mut sleeper);

    let expected = r#"{"ambienttemp": 22.5, "humidity": 40.0, "temperature1": 30.0, "temperature2": 35.0}"#;
    assert_eq!(harness.telemetry_bodies(), vec![expected, expected]);
    assert_eq!(
        harness.mails(),
        vec!["current temperature between: 30.0 and 35.0. And ambient temp is 22.5 with a humidity of 40.0%."]
    );
    assert_eq!(sleeper.slept, vec![Duration::from_secs(900), Duration::from_secs(900)]);
    assert!(harness.calls().is_empty());
}

#[test]
fn probes_are_read_in_ascending_order() {
    let harness = Harness::builder()
        .probe("28-00000a", 41250)
        .probe("28-00000b", 19000)
        .probe("28-00000c", 27500)
        .build();

    harness.monitor.run_cycle(&check_phase());

    assert_eq!(
        harness.telemetry_bodies(),
        vec![r#"{"ambienttemp": 25.0, "humidity": 50.0, "temperature1": 19.0, "temperature2": 27.5, "temperature3": 41.25}"#]
    );
}

#[test]
fn ambient_values_are_rounded() {
    let harness = Harness::builder()
        .probe("28-000001", 30000)
        .ambient(FakeAmbient::Fixed(23.456, 61.004))
        .build();

    harness.monitor.run_cycle(&check_phase());

    assert_eq!(
        harness.telemetry_bodies(),
        vec![r#"{"ambienttemp": 23.46, "humidity": 61.0, "temperature1": 30.0}"#]
    );
}

#[test]
fn broken_probe_degrades_and_the_cycle_goes_on() {
    let harness = Harness::builder()
        .probe("28-000001", 50000)
        .broken_probe("28-000002")
        .build();

    harness.monitor.run_cycle(&check_phase());

    let mails = harness.mails();
    assert_eq!(mails.len(), 1);
    assert!(mails[0].starts_with("a temperature probe cannot be read"), "{}", mails[0]);
    assert!(mails[0].contains("missing second line"), "{}", mails[0]);
    assert_eq!(
        harness.telemetry_bodies(),
        vec![r#"{"ambienttemp": 25.0, "humidity": 50.0, "temperature1": 50.0, "temperature2": null}"#]
    );
    // evaluation still ran on what was left
    let calls = harness.calls();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].twiml.contains("cool-side sensor too high, value 50.0"));
}

#[test]
fn publish_failure_is_reported_exactly_once() {
    let harness = Harness::builder().probe("28-000001", 30000).fail_publish().build();

    harness.monitor.run_cycle(&check_phase());

    let mails = harness.mails();
    assert_eq!(mails.len(), 1);
    assert_eq!(
        mails[0],
        "the monitor was unable to send telemetry with errorcode \
         telemetry endpoint rejected the message with status 503"
    );
    assert!(harness.calls().is_empty());
}

#[test]
fn evaluation_failure_is_reported_exactly_once() {
    let harness = Harness::builder()
        .probe("28-000001", 60000)
        .ambient(FakeAmbient::Fixed(f64::NAN, 50.0))
        .build();

    harness.monitor.run_cycle(&check_phase());

    let mails = harness.mails();
    assert_eq!(mails.len(), 1);
    assert!(mails[0].starts_with("the monitor was unable to do one of the checks"), "{}", mails[0]);
    assert!(harness.calls().is_empty());
    assert_eq!(harness.telemetry_bodies().len(), 1);
}

#[test]
fn hot_ambient_places_a_call() {
    let harness = Harness::builder()
        .probe("28-000001", 30000)
        .ambient(FakeAmbient::Fixed(40.01, 45.0))
        .build();

    harness.monitor.run_cycle(&check_phase());

    let calls = harness.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].to, DESTINATION);
    assert_eq!(calls[0].from, ORIGIN);
    assert!(calls[0].twiml.starts_with("<Response><Say>"));
    assert!(calls[0].twiml.contains("The reason is ambient temperature too high, value 40.01."));
    assert!(calls[0].twiml.contains("humidity is 45.0%"));
    assert!(calls[0].twiml.contains("temperatures are 30.0."));
    assert!(harness.mails().is_empty());
}

#[test]
fn ambient_and_cool_side_alerts_each_call() {
    let harness = Harness::builder()
        .probe("28-000001", 46000)
        .probe("28-000002", 52000)
        .ambient(FakeAmbient::Fixed(12.0, 45.0))
        .build();

    harness.monitor.run_cycle(&check_phase());

    let calls = harness.calls();
    assert_eq!(calls.len(), 2);
    assert!(calls[0].twiml.contains("ambient temperature too low, value 12.0"));
    assert!(calls[1].twiml.contains("cool-side sensor too high, value 46.0"));
}

#[test]
fn failed_call_is_reported_by_mail() {
    let harness = Harness::builder()
        .probe("28-000001", 30000)
        .ambient(FakeAmbient::Fixed(44.0, 45.0))
        .fail_call()
        .build();

    harness.monitor.run_cycle(&check_phase());

    assert_eq!(harness.calls().len(), 1);
    assert_eq!(
        harness.mails(),
        vec!["the monitor was unable to place an alert call with errorcode voice call rejected with status 401: bad token"]
    );
}

#[test]
fn zero_ambient_never_escalates() {
    let harness = Harness::builder()
        .probe("28-000001", 30000)
        .ambient(FakeAmbient::Fixed(0.0, 0.0))
        .build();

    harness.monitor.run_cycle(&check_phase());

    assert!(harness.calls().is_empty());
    assert!(harness.mails().is_empty());
}

#[test]
fn broken_ambient_probe_degrades_to_unavailable() {
    let harness = Harness::builder()
        .probe("28-000001", 30000)
        .ambient(FakeAmbient::Broken)
        .build();

    harness.monitor.run_cycle(&report_phase());

    let mails = harness.mails();
    assert_eq!(mails.len(), 2);
    assert!(mails[0].starts_with("the ambient probe cannot be read"), "{}", mails[0]);
    assert_eq!(
        mails[1],
        "current temperature between: 30.0. And ambient temp is unavailable with a humidity of unavailable."
    );
    assert_eq!(
        harness.telemetry_bodies(),
        vec![r#"{"ambienttemp": null, "humidity": null, "temperature1": 30.0}"#]
    );
    assert!(harness.calls().is_empty());
}

#[test]
fn empty_bus_is_reported() {
    let harness = Harness::builder().build();

    harness.monitor.run_cycle(&check_phase());

    let mails = harness.mails();
    assert_eq!(mails.len(), 1);
    assert!(mails[0].contains("no temperature probes discovered"), "{}", mails[0]);
    assert_eq!(
        harness.telemetry_bodies(),
        vec![r#"{"ambienttemp": 25.0, "humidity": 50.0}"#]
    );
}

#[test]
fn missing_bus_is_reported_and_sampling_continues() {
    let harness = Harness::builder().missing_bus().build();

    harness.monitor.run_cycle(&check_phase());

    let mails = harness.mails();
    assert_eq!(mails.len(), 2);
    assert!(mails[0].starts_with("the monitor was unable to list probe directories"), "{}", mails[0]);
    assert!(mails[1].starts_with("the list of temperatures cannot be created"), "{}", mails[1]);
    assert_eq!(harness.telemetry_bodies().len(), 1);
}

#[test]
fn failing_mail_sink_does_not_report_itself() {
    let harness = Harness::builder().probe("28-000001", 30000).fail_mail().build();

    harness.monitor.run_cycle(&report_phase());

    // one attempt for the summary, none for the failure of that attempt
    assert_eq!(harness.mails().len(), 1);
    assert_eq!(harness.telemetry_bodies().len(), 1);
}

#[test]
fn panicking_ambient_probe_does_not_stop_the_cool_side_check() {
    let harness = Harness::builder()
        .probe("28-000001", 60000)
        .ambient(FakeAmbient::Panics("driver bug"))
        .build();

    harness.monitor.run_cycle(&check_phase());

    assert_eq!(
        harness.mails(),
        vec!["the ambient probe cannot be read, returning an unavailable sample with errorcode panic: driver bug"]
    );
    assert_eq!(
        harness.telemetry_bodies(),
        vec![r#"{"ambienttemp": null, "humidity": null, "temperature1": 60.0}"#]
    );
    let calls = harness.calls();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].twiml.contains("cool-side sensor too high, value 60.0"));
}

#[test]
fn panicking_telemetry_client_is_reported_and_alerts_still_run() {
    let harness = Harness::builder()
        .probe("28-000001", 30000)
        .ambient(FakeAmbient::Fixed(41.0, 45.0))
        .panic_publish()
        .build();

    harness.monitor.run_cycle(&report_phase());

    let mails = harness.mails();
    assert_eq!(mails.len(), 2);
    assert_eq!(
        mails[0],
        "the monitor was unable to send telemetry with errorcode panic: connection pool poisoned"
    );
    assert!(mails[1].starts_with("current temperature between: 30.0."), "{}", mails[1]);
    assert_eq!(harness.calls().len(), 1);
}
