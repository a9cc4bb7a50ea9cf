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

#[macro_use]
extern crate log;

use std::path::{Path, PathBuf};
use std::process;
use std::time::Duration;

use clap::Parser;
use log::LevelFilter;
use log4rs::append::console::ConsoleAppender;
use log4rs::config::{Appender, Config, Root};
use log4rs::encode::pattern::PatternEncoder;

use terrarium_monitor::alert::AlertEvaluator;
use terrarium_monitor::config::{load_settings, Credentials, MonitorConfig};
use terrarium_monitor::notify::NotificationService;
use terrarium_monitor::schedule::{RetryPolicy, ThreadSleeper};
use terrarium_monitor::sensor::{IioAmbientProbe, SensorReader};
use terrarium_monitor::telemetry::TelemetryPublisher;
use terrarium_monitor::transport::{ConnectionString, HttpTelemetryClient, SmtpMailer, TwilioCaller};
use terrarium_monitor::{Monitor, Scheduler, Supervisor};

/// Unattended terrarium monitor
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    #[command(flatten)]
    credentials: Credentials,

    /// Settings file (probe paths, mail server, thresholds, phases)
    #[arg(long, default_value = "monitor.toml")]
    config: PathBuf,

    /// log4rs configuration
    #[arg(long, default_value = "logging.yml")]
    logging: PathBuf,
}

fn init_logging(path: &Path) {
    if let Err(e) = log4rs::init_file(path, Default::default()) {
        let stdout = ConsoleAppender::builder()
            .encoder(Box::new(PatternEncoder::new("{d(%Y-%m-%d %H:%M:%S)} {h({l})} {t} - {m}{n}")))
            .build();
        let config = Config::builder()
            .appender(Appender::builder().build("stdout", Box::new(stdout)))
            .build(Root::builder().appender("stdout").build(LevelFilter::Info));
        match config.map(log4rs::init_config) {
            Ok(Ok(_)) => warn!("Cannot load {} ({}), logging to the console", path.display(), e),
            _ => eprintln!("Cannot initialize logging: {}", e),
        }
    }
}

fn fail<E: std::fmt::Display>(what: &str, e: E) -> ! {
    error!("{}: {}", what, e);
    process::exit(1)
}

fn build_monitor(config: &MonitorConfig) -> Monitor {
    let credentials = &config.credentials;
    let settings = &config.settings;

    let mailer = SmtpMailer::new(&settings.mail, credentials, config.recipient())
        .unwrap_or_else(|e| fail("Cannot set up the mail transport", e));
    let caller = TwilioCaller::new(
        &settings.voice.api_base,
        &credentials.account_sid,
        &credentials.auth_token,
        Duration::from_secs(settings.voice.timeout_secs),
    )
    .unwrap_or_else(|e| fail("Cannot set up the voice client", e));
    let notifier = NotificationService::new(
        Box::new(mailer),
        Box::new(caller),
        credentials.phonenumber_from.clone(),
        credentials.phonenumber_to.clone(),
    );

    let connection = ConnectionString::parse(&credentials.connection_string);
    let endpoint = match settings.telemetry.endpoint {
        Some(ref endpoint) => endpoint.clone(),
        None => connection
            .events_endpoint()
            .unwrap_or_else(|e| fail("Cannot determine the telemetry endpoint", e)),
    };
    let credential = connection
        .credential()
        .unwrap_or_else(|e| fail("Cannot read the telemetry credential", e));
    let ingest = HttpTelemetryClient::new(
        endpoint,
        credential,
        Duration::from_secs(settings.telemetry.timeout_secs),
        Duration::from_secs(settings.telemetry.token_ttl_secs),
    )
    .unwrap_or_else(|e| fail("Cannot set up the telemetry client", e));

    let ambient = IioAmbientProbe::new(&settings.ambient);
    Monitor::new(
        SensorReader::new(&settings.probes, Box::new(ambient)),
        TelemetryPublisher::new(Box::new(ingest)),
        AlertEvaluator::new(settings.thresholds),
        notifier,
    )
}

fn main() {
    let cli = Cli::parse();
    init_logging(&cli.logging);
    info!("Loading configuration");

    let settings = load_settings(&cli.config).unwrap_or_else(|e| fail("Cannot load settings", e));
    let config = MonitorConfig {
        credentials: cli.credentials,
        settings,
    };

    if let Err(e) = ctrlc::set_handler(|| {
        warn!("Interrupted by the operator, shutting down");
        process::exit(130);
    }) {
        fail("Cannot install the interrupt handler", e);
    }

    let monitor = build_monitor(&config);
    let scheduler = Scheduler::new(config.settings.phases()).unwrap_or_else(|e| fail("Invalid schedule", e));
    let policy = RetryPolicy {
        delay: config.settings.retry_delay(),
    };

    info!(
        "Starting terrarium monitor with {} phases, reporting to {}",
        scheduler.phases().len(),
        config.recipient()
    );
    Supervisor::new(&scheduler, policy, monitor.notifier()).run(&monitor, &mut ThreadSleeper);
}
