//! Sample-point schedule for characteristic-polynomial evaluation.

use super::prime_field::Zp;

/// Generates the first `count` evaluation abscissas `1, -1, 2, -2, 3, -3, ...`
/// as field elements.
///
/// The sequence depends only on the modulus and `count`, so two peers
/// configured with the same `NumSamples` obtain byte-identical points. This
/// determinism is what makes per-node sample vectors comparable elementwise
/// across a reconciliation session.
pub fn sample_points(count: usize) -> Vec<Zp> {
    (0..count)
        .map(|k| {
            let magnitude = Zp::from((k / 2 + 1) as u64);
            if k % 2 == 0 {
                magnitude
            } else {
                magnitude.neg()
            }
        })
        .collect()
}
