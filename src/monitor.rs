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

use crate::alert::AlertEvaluator;
use crate::dto::TelemetryFrame;
use crate::notify::NotificationService;
use crate::policy::StageGuard;
use crate::schedule::{Cycle, Phase};
use crate::sensor::SensorReader;
use crate::telemetry::TelemetryPublisher;

/// The sampling pipeline: sample, publish, evaluate and, in summary phases,
/// mail the summary. Stages run strictly in that order and a failed stage
/// never stops the ones after it.
pub struct Monitor {
    sensors: SensorReader,
    publisher: TelemetryPublisher,
    evaluator: AlertEvaluator,
    notifier: NotificationService,
}

impl Monitor {
    pub fn new(
        sensors: SensorReader,
        publisher: TelemetryPublisher,
        evaluator: AlertEvaluator,
        notifier: NotificationService,
    ) -> Monitor {
        Monitor {
            sensors,
            publisher,
            evaluator,
            notifier,
        }
    }

    pub fn notifier(&self) -> &NotificationService {
        &self.notifier
    }

    pub fn sample(&self, guard: &StageGuard) -> TelemetryFrame {
        let probes = self.sensors.discover_probes(guard);
        let temperatures = self.sensors.read_all_probes(&probes, guard);
        let ambient = self.sensors.read_ambient(guard);
        TelemetryFrame {
            ambient,
            temperatures,
        }
    }
}

impl Cycle for Monitor {
    fn run_cycle(&self, phase: &Phase) {
        let guard = StageGuard::new(&self.notifier);
        let frame = self.sample(&guard);

        self.publisher.publish(&frame, &guard);

        info!("Checking sensors");
        self.evaluator.check_and_alert(&frame, &self.notifier, &guard);

        if phase.summary {
            let body = self.notifier.format_summary_body(&frame.ambient, &frame.temperatures);
            if !body.is_empty() {
                info!("Sending summary mail: {}", body);
                self.notifier.send_mail(&body);
            }
        }
    }
}
