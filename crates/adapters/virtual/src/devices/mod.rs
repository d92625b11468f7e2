//! Virtual device implementations: light, sensor.
//!
//! A device's state lives in a [`Link`] shared between the driver (owned by
//! the bound thing) and the panel kept by whoever simulates the hardware.

mod light;
mod sensor;

pub use light::{LightPanel, VirtualLight};
pub use sensor::{SensorPanel, VirtualSensor};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use thinghub_domain::attribute::Changes;
use thinghub_domain::driver::PulledCallback;

/// State and callback shared by a driver and its panel.
struct Link<S> {
    state: Mutex<S>,
    callback: Mutex<Option<PulledCallback>>,
    reachable: AtomicBool,
}

impl<S> Link<S> {
    fn new(state: S) -> Self {
        Self {
            state: Mutex::new(state),
            callback: Mutex::new(None),
            reachable: AtomicBool::new(true),
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, S> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn connect(&self, callback: PulledCallback) {
        *self
            .callback
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(callback);
    }

    fn disconnect(&self) {
        self.callback
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    /// Hand `changes` to the bound thing, if any. The callback is cloned out
    /// so it never runs under the lock.
    fn report(&self, changes: Option<Changes>) {
        let callback = self
            .callback
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(callback) = callback {
            callback(changes);
        }
    }

    fn is_reachable(&self) -> bool {
        self.reachable.load(Ordering::Relaxed)
    }

    /// Returns whether reachability actually changed.
    fn set_reachable(&self, reachable: bool) -> bool {
        self.reachable.swap(reachable, Ordering::Relaxed) != reachable
    }
}
