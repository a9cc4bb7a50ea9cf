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

use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Args;
use serde::Deserialize;

use crate::alert::Thresholds;
use crate::error::ConfigError;
use crate::schedule::Phase;

/// One cycle's worth of idle time in the default schedule.
pub const DEFAULT_PHASE_SECS: u64 = 900;

/// Secrets and numbers given at process start. All seven are required.
#[derive(Args, Debug, Clone)]
pub struct Credentials {
    /// Mail account, also the sender address
    #[arg(long, env = "MAIL_USER")]
    pub mail_user: String,
    #[arg(long, env = "MAIL_PASSWORD", hide_env_values = true)]
    pub mail_password: String,
    /// Telephony account id
    #[arg(long, env = "ACCOUNT_SID")]
    pub account_sid: String,
    #[arg(long, env = "AUTH_TOKEN", hide_env_values = true)]
    pub auth_token: String,
    /// Cloud ingestion credential
    #[arg(long, env = "CONNECTION_STRING", hide_env_values = true)]
    pub connection_string: String,
    /// Number the alert calls come from
    #[arg(long, env = "PHONENUMBER_FROM")]
    pub phonenumber_from: String,
    /// Number the alert calls go to
    #[arg(long, env = "PHONENUMBER_TO")]
    pub phonenumber_to: String,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Settings {
    pub probes: ProbeSettings,
    pub ambient: AmbientSettings,
    pub mail: MailSettings,
    pub telemetry: TelemetrySettings,
    pub voice: VoiceSettings,
    pub thresholds: Thresholds,
    pub phases: Vec<PhaseSettings>,
    pub supervisor: SupervisorSettings,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ProbeSettings {
    pub bus_path: PathBuf,
    pub prefix: String,
    pub data_file: String,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        ProbeSettings {
            bus_path: PathBuf::from("/sys/bus/w1/devices"),
            prefix: "28".to_owned(),
            data_file: "w1_slave".to_owned(),
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct AmbientSettings {
    pub device_path: PathBuf,
}

impl Default for AmbientSettings {
    fn default() -> Self {
        AmbientSettings {
            device_path: PathBuf::from("/sys/bus/iio/devices/iio:device0"),
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct MailSettings {
    pub smtp_host: String,
    pub smtp_port: u16,
    /// Defaults to the mail account itself.
    pub recipient: Option<String>,
}

impl Default for MailSettings {
    fn default() -> Self {
        MailSettings {
            smtp_host: "smtp.mail.yahoo.com".to_owned(),
            smtp_port: 465,
            recipient: None,
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct TelemetrySettings {
    /// Derived from the connection string when absent.
    pub endpoint: Option<String>,
    pub timeout_secs: u64,
    /// Lifetime of a token signed with the device key.
    pub token_ttl_secs: u64,
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        TelemetrySettings {
            endpoint: None,
            timeout_secs: 30,
            token_ttl_secs: 3600,
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct VoiceSettings {
    pub api_base: String,
    pub timeout_secs: u64,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        VoiceSettings {
            api_base: "https://api.twilio.com".to_owned(),
            timeout_secs: 30,
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct PhaseSettings {
    pub name: String,
    #[serde(default)]
    pub summary: bool,
    #[serde(default = "default_phase_secs")]
    pub duration_secs: u64,
}

fn default_phase_secs() -> u64 {
    DEFAULT_PHASE_SECS
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct SupervisorSettings {
    pub retry_delay_secs: u64,
}

impl Default for SupervisorSettings {
    fn default() -> Self {
        SupervisorSettings {
            retry_delay_secs: DEFAULT_PHASE_SECS,
        }
    }
}

impl Settings {
    /// Configured phases, or the default half-hour period: a phase with
    /// the summary mail followed by one without.
    pub fn phases(&self) -> Vec<Phase> {
        if self.phases.is_empty() {
            return Phase::default_period();
        }
        self.phases
            .iter()
            .map(|p| Phase::new(p.name.clone(), p.summary, Duration::from_secs(p.duration_secs)))
            .collect()
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.supervisor.retry_delay_secs)
    }
}

/// Everything the monitor needs, built once at startup.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub credentials: Credentials,
    pub settings: Settings,
}

impl MonitorConfig {
    pub fn recipient(&self) -> &str {
        self.settings
            .mail
            .recipient
            .as_deref()
            .unwrap_or(&self.credentials.mail_user)
    }
}

pub fn read_config<T: Read + Sized>(mut f: T) -> Result<Settings, ConfigError> {
    let mut buffer = String::new();
    f.read_to_string(&mut buffer)?;
    Ok(toml::from_str(&buffer)?)
}

/// Reads the settings file. A missing file means defaults throughout.
pub fn load_settings(path: &Path) -> Result<Settings, ConfigError> {
    match File::open(path) {
        Ok(f) => read_config(f),
        Err(ref e) if e.kind() == ErrorKind::NotFound => {
            info!("No settings at {}, using defaults", path.display());
            Ok(Settings::default())
        }
        Err(e) => Err(ConfigError::Io(e)),
    }
}
