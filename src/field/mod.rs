//! Field arithmetic primitives for the reconciliation engine.
//! Contains the SKS prime field and the sample-point schedule.

pub mod points;
pub mod prime_field;

pub use points::sample_points;
pub use prime_field::{ArithmeticError, Zp, ZpDecodeError, P_SKS, P_SKS_BITS, ZP_BYTES};
