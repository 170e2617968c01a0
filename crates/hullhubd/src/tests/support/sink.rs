use std::sync::Mutex;

use crate::lock_unpoisoned;
use crate::monitor::{Crossing, CrossingSink, ThresholdEvent};

/// Collects crossings delivered by the watcher.
#[derive(Debug, Default)]
pub(crate) struct RecordingCrossingSink {
    events: Mutex<Vec<ThresholdEvent>>,
}

impl RecordingCrossingSink {
    pub(crate) fn crossings(&self) -> Vec<Crossing> {
        lock_unpoisoned(&self.events)
            .iter()
            .map(|event| event.crossing)
            .collect()
    }

    pub(crate) fn metrics(&self) -> Vec<f64> {
        lock_unpoisoned(&self.events)
            .iter()
            .map(|event| event.metric)
            .collect()
    }
}

impl CrossingSink for RecordingCrossingSink {
    fn crossed(&self, event: &ThresholdEvent) {
        lock_unpoisoned(&self.events).push(*event);
    }
}
