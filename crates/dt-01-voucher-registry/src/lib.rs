//! # DT-01 Voucher Registry
//!
//! Maps voucher type tags to the codecs that turn wire bytes into in-memory
//! payloads and back.
//!
//! **Subsystem ID:** 1
//! **Architecture:** Hexagonal (domain + service)
//!
//! ## Purpose
//!
//! Vouchers travel between peers as `(type tag, bytes)`. Before a validator
//! ever sees one, the registry checks that the tag is known and the bytes
//! decode. An unknown tag or malformed payload on an inbound Open is a
//! rejection, not a crash.
//!
//! ## Module Structure
//!
//! ```text
//! dt-01-voucher-registry/
//! ├── domain/       # VoucherCodec, BincodeCodec, JsonCodec, RegistryError
//! └── registry.rs   # VoucherRegistry
//! ```
//!
//! A manager keeps two registries: one for vouchers, one for voucher results.

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod domain;
pub mod registry;

pub use domain::{BincodeCodec, JsonCodec, RegistryError, VoucherCodec};
pub use registry::VoucherRegistry;
