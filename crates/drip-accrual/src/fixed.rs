//! Integer fixed-point helpers. Every division floors.

/// Compute `floor(value * mul / div)` without forming the full product.
///
/// Splits `value = q * div + r` so the result is `q * mul + floor(r * mul / div)`,
/// which is exact and only overflows when the true result does not fit
/// (or when `div * mul` itself exceeds `u128`). Returns `None` on overflow
/// or when `div` is zero.
pub fn mul_div_floor(value: u128, mul: u128, div: u128) -> Option<u128> {
    if div == 0 {
        return None;
    }
    let q = value / div;
    let r = value % div;
    let head = q.checked_mul(mul)?;
    let tail = r.checked_mul(mul)? / div;
    head.checked_add(tail)
}

/// Compute `floor(value * num * scale / den)` exactly for `u64` ratios.
///
/// `value * num / den` is split into its floor and remainder; the remainder
/// is scaled separately, so no intermediate exceeds `u128` unless the result
/// does. Returns `None` on overflow or when `den` is zero.
pub fn mul_ratio_scaled_floor(value: u128, num: u64, den: u64, scale: u128) -> Option<u128> {
    let (num, den) = (u128::from(num), u128::from(den));
    let whole = mul_div_floor(value, num, den)?;
    // Both factors are below 2^64.
    let rem = (value % den) * num % den;
    let frac = rem.checked_mul(scale)? / den;
    whole.checked_mul(scale)?.checked_add(frac)
}
