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

use std::fmt;
use std::io;
use std::path::PathBuf;

use crate::policy::Stage;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read settings: {0}")]
    Io(#[from] io::Error),
    #[error("cannot parse settings: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("the schedule needs at least one phase")]
    NoPhases,
    #[error("invalid connection string: {0}")]
    ConnectionString(String),
}

#[derive(Debug, thiserror::Error)]
pub enum SensorError {
    #[error("cannot list probe bus {}: {source}", path.display())]
    ListBus { path: PathBuf, source: io::Error },
    #[error("cannot read {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("malformed record in {}: {detail}", path.display())]
    Malformed { path: PathBuf, detail: String },
    #[error("no temperature probes discovered")]
    NoProbes,
}

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("cannot encode telemetry frame: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("telemetry request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("telemetry endpoint rejected the message with status {status}")]
    Rejected { status: u16 },
    #[error("cannot sign the shared access signature: {0}")]
    Signing(#[from] hmac::digest::InvalidLength),
}

#[derive(Debug, thiserror::Error)]
pub enum EvaluationError {
    #[error("{field} is not a finite number ({value})")]
    NonFinite { field: String, value: f64 },
}

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("SMTP transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),
    #[error("mail address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),
    #[error("mail build error: {0}")]
    Build(String),
}

#[derive(Debug, thiserror::Error)]
pub enum CallError {
    #[error("voice call request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("voice call rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// Any error a pipeline stage can end with.
#[derive(Debug, thiserror::Error)]
pub enum StageError {
    #[error(transparent)]
    Sensor(#[from] SensorError),
    #[error(transparent)]
    Publish(#[from] PublishError),
    #[error(transparent)]
    Evaluation(#[from] EvaluationError),
    #[error(transparent)]
    Call(#[from] CallError),
    #[error(transparent)]
    Mail(#[from] MailError),
    #[error("cannot format text: {0}")]
    Format(#[from] fmt::Error),
    #[error("panic: {0}")]
    Panicked(String),
}

/// A stage error tagged with the stage it came from. The `Display` output is
/// the diagnostic mailed to the operator.
#[derive(Debug)]
pub struct StageFailure {
    pub stage: Stage,
    pub error: StageError,
}

impl StageFailure {
    pub fn new<E: Into<StageError>>(stage: Stage, error: E) -> StageFailure {
        StageFailure {
            stage,
            error: error.into(),
        }
    }
}

impl fmt::Display for StageFailure {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} with errorcode {}", self.stage.policy().report, self.error)
    }
}

impl std::error::Error for StageFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}
