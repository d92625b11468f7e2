//! # thinghub-app
//!
//! Application layer: the thing runtime and **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define **port traits** that adapters must implement (driven/outbound ports):
//!   - `MetadataStore`: load & save per-thing metadata documents
//!   - `EventPublisher`: fan thing notifications out to subscribers
//! - Define **driving/inbound** entry points:
//!   - `MetadataService`: restore and persist metadata around a thing
//!   - `ThingHandle`: cloneable handle onto a thing owned by a single task
//! - Provide **in-process infrastructure** (event bus) that doesn't need IO
//! - Orchestrate domain things without knowing *how* persistence or devices work
//!
//! ## Dependency rule
//! Depends on `thinghub-domain` only (plus `tokio` for channels and tasks).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod event_bus;
pub mod ports;
pub mod runtime;
pub mod services;
