#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]

//! Core library for set reconciliation over the SKS prime field.
//!
//! The crate implements the data structure at the heart of the
//! Minsky-Trachtenberg-Zippel reconciliation protocol: a prefix tree whose
//! nodes carry point-evaluations of the characteristic polynomial of their
//! subtree's element multiset. Peers holding such trees can locate their
//! symmetric difference with communication proportional to the difference
//! size by comparing sample vectors level by level; the interpolation stage
//! that recovers the differing elements, and the transport that carries the
//! exchange, live in upper layers and only consume the read-only views
//! exposed here.
//!
//! Everything that crosses a peer boundary is deterministic by
//! construction: the modulus [`field::P_SKS`], the sample-point schedule,
//! the canonical little-endian element encoding and the LSB-first
//! navigation bitstring are fixed properties of the format, while the
//! remaining knobs travel in a validated [`settings::Settings`] record.

pub mod bits;
pub mod field;
pub mod ptree;
pub mod settings;

pub use bits::Bitstring;
pub use field::{sample_points, ArithmeticError, Zp, P_SKS, P_SKS_BITS, ZP_BYTES};
pub use ptree::{navigation_bits, NodeRef, PTree, PTreeError};
pub use settings::{Settings, SettingsBuilder, SettingsError};
