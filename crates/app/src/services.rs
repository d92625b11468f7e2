//! Application services: use-cases built on top of ports.

pub mod metadata_service;

pub use metadata_service::MetadataService;
