//! Burrow Core: traits and types for the burrow storage subsystem
//!
//! This crate defines the engine-independent abstractions:
//! - Error type shared by every layer
//! - Marshalling contract (record ⇄ raw bytes) and byte-level primitives
//! - Record identity traits (`Record`, `StoreKey`)
//! - Process-wide marshaller registry keyed by record type
//! - Environment configuration

pub mod config;
pub mod error;
pub mod marshal;
pub mod registry;

pub use config::{EnvConfig, SyncMode};
pub use error::{Result, StoreError};
pub use marshal::{ByteReader, ByteWriter, Marshal, MarshalFns, Record, StoreKey};
pub use registry::{lookup, register};
