//! Driver capability contract.
//!
//! A driver (or bridge) translates abstract attribute values to and from a
//! concrete device protocol. Concrete drivers live in adapter crates; the
//! thing engine only ever talks to them through [`Driver`].
//!
//! All calls are fire-and-forget from the thing's point of view: `push`
//! and `pull` never report failures back, and fresh readings arrive later
//! through the [`PulledCallback`] handed over in [`Driver::connect`].

use std::sync::Arc;
use std::time::Duration;

use crate::attribute::{Change, Changes};
use crate::identity::DriverIdentity;

/// Invoked by a driver whenever new device data is available.
///
/// `None` means "nothing new to read, but something about the device
/// changed" (reachability, for instance).
pub type PulledCallback = Arc<dyn Fn(Option<Changes>) + Send + Sync>;

/// Transport backend bound to at most one thing at a time.
pub trait Driver: Send {
    /// Stable descriptor of the device behind this driver.
    fn identity(&self) -> DriverIdentity;

    /// Register the callback used to deliver pulled data.
    fn connect(&mut self, pulled: PulledCallback);

    /// Deliver a batch of output values, keyed by attribute code.
    ///
    /// Failures are the driver's to log; nothing is returned.
    fn push(&mut self, changes: &[Change]);

    /// Ask for a refresh; the answer arrives through the pulled callback.
    fn pull(&mut self);

    /// Detach from the device, returning how long to wait before the
    /// driver may be stopped forcibly.
    fn disconnect(&mut self) -> Duration;

    /// Liveness probe.
    fn reachable(&self) -> bool;
}
