//! Virtual temperature sensor: reports a drifting reading on every pull.

use std::sync::Arc;
use std::time::Duration;

use thinghub_domain::attribute::{AttributeValue, Change, Changes};
use thinghub_domain::driver::{Driver, PulledCallback};
use thinghub_domain::identity::DriverIdentity;

use super::Link;
use crate::DRIVER;

const INITIAL: f64 = 21.5;
const LOWEST: f64 = 18.0;
const HIGHEST: f64 = 24.0;
const STEP: f64 = 0.25;

#[derive(Debug, Clone, Copy)]
struct SensorState {
    temperature: f64,
    step: f64,
}

impl SensorState {
    fn reading(self) -> Changes {
        vec![(
            "temperature".to_string(),
            AttributeValue::Float(self.temperature),
        )]
    }

    /// Move one step, bouncing between the lowest and highest reading.
    fn drift(&mut self) {
        let next = self.temperature + self.step;
        if (LOWEST..=HIGHEST).contains(&next) {
            self.temperature = next;
        } else {
            self.step = -self.step;
            self.temperature += self.step;
        }
    }
}

/// A simulated temperature sensor.
///
/// Sensors do not accept outputs; pushes are logged and ignored.
pub struct VirtualSensor {
    serial: String,
    link: Arc<Link<SensorState>>,
}

impl VirtualSensor {
    #[must_use]
    pub fn new(serial: impl Into<String>) -> Self {
        Self {
            serial: serial.into(),
            link: Arc::new(Link::new(SensorState {
                temperature: INITIAL,
                step: STEP,
            })),
        }
    }

    #[must_use]
    pub fn panel(&self) -> SensorPanel {
        SensorPanel(Arc::clone(&self.link))
    }
}

impl Driver for VirtualSensor {
    fn identity(&self) -> DriverIdentity {
        DriverIdentity::new(DRIVER).field("serial", &self.serial)
    }

    fn connect(&mut self, pulled: PulledCallback) {
        self.link.connect(pulled);
    }

    fn push(&mut self, changes: &[Change]) {
        tracing::debug!(serial = %self.serial, count = changes.len(), "sensor ignores outputs");
    }

    fn pull(&mut self) {
        if !self.link.is_reachable() {
            tracing::debug!(serial = %self.serial, "sensor unreachable, pull ignored");
            return;
        }
        let state = {
            let mut state = self.link.lock_state();
            let current = *state;
            state.drift();
            current
        };
        self.link.report(Some(state.reading()));
    }

    fn disconnect(&mut self) -> Duration {
        self.link.disconnect();
        Duration::ZERO
    }

    fn reachable(&self) -> bool {
        self.link.is_reachable()
    }
}

/// The room around a [`VirtualSensor`].
#[derive(Clone)]
pub struct SensorPanel(Arc<Link<SensorState>>);

impl SensorPanel {
    /// Reading the next pull will report.
    #[must_use]
    pub fn temperature(&self) -> f64 {
        self.0.lock_state().temperature
    }

    /// Force the temperature; the sensor reports it right away.
    pub fn set_temperature(&self, temperature: f64) {
        let state = {
            let mut state = self.0.lock_state();
            state.temperature = temperature;
            *state
        };
        if self.0.is_reachable() {
            self.0.report(Some(state.reading()));
        }
    }

    pub fn set_reachable(&self, reachable: bool) {
        if self.0.set_reachable(reachable) {
            self.0.report(None);
        }
    }
}
