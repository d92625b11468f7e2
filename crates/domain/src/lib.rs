//! # thinghub-domain
//!
//! Pure domain model for thinghub: devices modelled as typed state
//! machines ("things") bound at runtime to pluggable drivers.
//!
//! ## Responsibilities
//! - Foundational types: typed identifiers, error conventions, timestamps
//! - Define **Attributes** (typed, validated value slots with purpose/role tags)
//! - Define **Models** (`ThingType`: reusable templates built declaratively)
//! - Run the **Thing** engine: get/set/update, transactions, listeners,
//!   purpose-based key resolution and the driver binding lifecycle
//! - Define the **Driver** capability contract the engine talks to
//! - Hold per-thing **Metadata** with timestamped merges
//!
//! ## Dependency rule
//! This crate has **no internal dependencies** and performs no IO.
//! Persistence and async plumbing are expressed as ports in the `app` crate.

pub mod error;
pub mod id;
pub mod time;

pub mod attribute;
pub mod driver;
pub mod event;
pub mod identity;
pub mod key;
pub mod metadata;
pub mod model;
pub mod thing;
