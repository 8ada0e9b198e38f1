//! Pure elementwise kernels over local slices.
//!
//! No communication happens here: each kernel reads this member's input
//! slices and writes a disjoint output slice of the same length. All kernels
//! are O(local_n) and share nothing with other members.

/// `z[i] = x[i] + y[i]`.
pub fn vector_sum(x: &[f64], y: &[f64], z: &mut [f64]) {
    debug_assert_eq!(x.len(), y.len());
    debug_assert_eq!(x.len(), z.len());
    for ((z, x), y) in z.iter_mut().zip(x).zip(y) {
        *z = x + y;
    }
}

/// `z[i] = x[i] * y[i]`.
///
/// The per-element product stays materialized; nothing reduces it to a
/// single scalar. Callers display it like any other vector.
pub fn elementwise_product(x: &[f64], y: &[f64], z: &mut [f64]) {
    debug_assert_eq!(x.len(), y.len());
    debug_assert_eq!(x.len(), z.len());
    for ((z, x), y) in z.iter_mut().zip(x).zip(y) {
        *z = x * y;
    }
}

/// `z[i] = x[i] * scalar`.
pub fn scalar_product(x: &[f64], scalar: i64, z: &mut [f64]) {
    debug_assert_eq!(x.len(), z.len());
    let scalar = scalar as f64;
    for (z, x) in z.iter_mut().zip(x) {
        *z = x * scalar;
    }
}
