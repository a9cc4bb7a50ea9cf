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

//! Unattended terrarium monitor.
//!
//! Samples one-wire temperature probes and a combined temperature/humidity
//! probe, forwards the readings to a cloud ingestion endpoint, escalates
//! out-of-range readings with a voice call and mails a periodic summary.
//! Every stage degrades to a fallback value and reports by mail instead of
//! stopping the monitor; see [`policy`] for the table.

#[macro_use]
extern crate log;

pub mod alert;
pub mod config;
pub mod datasink;
pub mod dto;
pub mod error;
pub mod monitor;
pub mod notify;
pub mod policy;
pub mod schedule;
pub mod sensor;
pub mod telemetry;
pub mod transport;

pub use monitor::Monitor;
pub use schedule::{Phase, Scheduler, Supervisor};
