//! # thinghub-adapter-virtual
//!
//! Virtual/demo drivers that simulate devices for testing and demonstration
//! purposes, together with the thing types they are meant to be bound to.
//!
//! ## Provided devices
//!
//! | Driver | Thing type | Behaviour |
//! |--------|------------|-----------|
//! | [`VirtualLight`] | [`models::light`] | Applies pushed `on` / `brightness` and echoes its new state |
//! | [`VirtualSensor`] | [`models::temperature_sensor`] | Reports a slowly drifting `temperature` on every pull |
//!
//! Each driver hands out a *panel* that plays the role of the physical
//! device: flipping a switch by hand, changing the room temperature or
//! pulling the plug are reported to the bound thing like real hardware would.
//!
//! ## Dependency rule
//!
//! Depends on `thinghub-domain` only.

mod devices;
pub mod models;

pub use devices::{LightPanel, SensorPanel, VirtualLight, VirtualSensor};

/// Driver name used in the identity of every virtual device.
pub const DRIVER: &str = "virtual";
