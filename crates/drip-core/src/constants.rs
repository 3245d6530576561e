//! Protocol constants. All amounts are in the smallest token unit.

/// Fixed-point scale for accrual weights (parts per billion).
///
/// Each sub-interval contributes `floor(value * duration * ACCRUAL_PRECISION / total)`,
/// and the sum is divided by `ACCRUAL_PRECISION` once at the end.
pub const ACCRUAL_PRECISION: u128 = 1_000_000_000;

/// Fixed-point scale for annual reward rates (parts per million).
///
/// A 15% APR is `150_000`.
pub const RATE_PRECISION: u128 = 1_000_000;

/// Seconds in the reward year (365 days).
pub const SECONDS_PER_YEAR: u128 = 365 * 24 * 60 * 60;

/// Version of the Merkle leaf encoding. Bumped on any change to the byte
/// layout or hashing rules in [`crate::merkle`].
pub const LEAF_SCHEMA_VERSION: u8 = 1;

/// Encoded leaf length: participant (20) + beneficiary (20) + amount (32).
pub const LEAF_ENCODED_LEN: usize = 20 + 20 + AMOUNT_WIDTH;

/// Width of the big-endian amount field in a leaf (one 256-bit word).
pub const AMOUNT_WIDTH: usize = 32;

/// Infraction-count penalty table as `(numerator, denominator)` pairs.
///
/// | Infractions | Factor |
/// |-------------|--------|
/// | 0–1         | 1      |
/// | 2           | 2/3    |
/// | 3           | 1/3    |
/// | 4+          | 0      |
pub fn penalty_factor(infractions: u32) -> (u128, u128) {
    match infractions {
        0 | 1 => (1, 1),
        2 => (2, 3),
        3 => (1, 3),
        _ => (0, 1),
    }
}
