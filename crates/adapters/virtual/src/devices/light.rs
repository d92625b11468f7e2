//! Virtual light: applies pushed `on` / `brightness` and echoes its state.

use std::sync::Arc;
use std::time::Duration;

use thinghub_domain::attribute::{AttributeValue, Change, Changes};
use thinghub_domain::driver::{Driver, PulledCallback};
use thinghub_domain::identity::DriverIdentity;

use super::Link;
use crate::DRIVER;

#[derive(Debug, Clone, Copy, PartialEq)]
struct LightState {
    on: bool,
    brightness: f64,
}

impl Default for LightState {
    fn default() -> Self {
        Self {
            on: false,
            brightness: 100.0,
        }
    }
}

impl LightState {
    fn readings(self) -> Changes {
        vec![
            ("on".to_string(), AttributeValue::Bool(self.on)),
            (
                "brightness".to_string(),
                AttributeValue::Float(self.brightness),
            ),
        ]
    }
}

/// A simulated dimmable light.
pub struct VirtualLight {
    serial: String,
    link: Arc<Link<LightState>>,
}

impl VirtualLight {
    /// Create a light that starts switched off at full brightness.
    #[must_use]
    pub fn new(serial: impl Into<String>) -> Self {
        Self {
            serial: serial.into(),
            link: Arc::new(Link::new(LightState::default())),
        }
    }

    /// Physical controls of this light.
    #[must_use]
    pub fn panel(&self) -> LightPanel {
        LightPanel(Arc::clone(&self.link))
    }
}

impl Driver for VirtualLight {
    fn identity(&self) -> DriverIdentity {
        DriverIdentity::new(DRIVER).field("serial", &self.serial)
    }

    fn connect(&mut self, pulled: PulledCallback) {
        self.link.connect(pulled);
    }

    fn push(&mut self, changes: &[Change]) {
        if !self.link.is_reachable() {
            tracing::warn!(serial = %self.serial, "light unreachable, push dropped");
            return;
        }

        let state = {
            let mut state = self.link.lock_state();
            for (code, value) in changes {
                match code.as_str() {
                    "on" => state.on = value.is_truthy(),
                    "brightness" => match value.as_f64() {
                        Some(brightness) => state.brightness = brightness.clamp(0.0, 100.0),
                        None => {
                            tracing::warn!(serial = %self.serial, %value, "brightness is not a number");
                        }
                    },
                    other => tracing::debug!(serial = %self.serial, code = other, "ignoring unknown output"),
                }
            }
            *state
        };

        self.link.report(Some(state.readings()));
    }

    fn pull(&mut self) {
        if !self.link.is_reachable() {
            tracing::debug!(serial = %self.serial, "light unreachable, pull ignored");
            return;
        }
        let state = *self.link.lock_state();
        self.link.report(Some(state.readings()));
    }

    fn disconnect(&mut self) -> Duration {
        self.link.disconnect();
        Duration::ZERO
    }

    fn reachable(&self) -> bool {
        self.link.is_reachable()
    }
}

/// The wall switch and power plug of a [`VirtualLight`].
#[derive(Clone)]
pub struct LightPanel(Arc<Link<LightState>>);

impl LightPanel {
    #[must_use]
    pub fn is_on(&self) -> bool {
        self.0.lock_state().on
    }

    #[must_use]
    pub fn brightness(&self) -> f64 {
        self.0.lock_state().brightness
    }

    /// Flip the light by hand; the bound thing receives the new state.
    pub fn toggle(&self) {
        let state = {
            let mut state = self.0.lock_state();
            state.on = !state.on;
            *state
        };
        if self.0.is_reachable() {
            self.0.report(Some(state.readings()));
        }
    }

    /// Plug or unplug the light. The bound thing is told that something
    /// changed, without new readings.
    pub fn set_reachable(&self, reachable: bool) {
        if self.0.set_reachable(reachable) {
            self.0.report(None);
        }
    }
}
