//! Order-independent sums for SUM, COUNT and AVG merging.

use shardline_common::datum::{float_parts, Datum};

/// Bit 0 of the fixed-point accumulator weighs 2^-1074, the smallest
/// subnormal. The largest finite f64 ends below bit 2098; the remaining
/// high bits absorb carries and hold the two's complement sign.
const LIMBS: usize = 35;

/// Exact sum of `f64` values.
///
/// Every finite input is added into a two's complement fixed-point integer
/// wide enough for the whole f64 range, so the running total is exact and
/// the rounded result does not depend on insertion order.
#[derive(Debug, Clone)]
pub struct FloatSum {
    limbs: [u64; LIMBS],
    nan: bool,
    pos_inf: bool,
    neg_inf: bool,
}

impl Default for FloatSum {
    fn default() -> Self {
        Self {
            limbs: [0; LIMBS],
            nan: false,
            pos_inf: false,
            neg_inf: false,
        }
    }
}

impl FloatSum {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, v: f64) {
        if v.is_nan() {
            self.nan = true;
            return;
        }
        if v.is_infinite() {
            if v > 0.0 {
                self.pos_inf = true;
            } else {
                self.neg_inf = true;
            }
            return;
        }
        let (negative, mantissa, exponent) = float_parts(v);
        if mantissa == 0 {
            return;
        }
        // exponent >= -1074, so the shift is never negative.
        let shift = (exponent + 1074).unsigned_abs();
        let limb = (shift / 64) as usize;
        let wide = u128::from(mantissa) << (shift % 64);
        let parts = [wide as u64, (wide >> 64) as u64];
        if negative {
            self.sub_at(limb, parts);
        } else {
            self.add_at(limb, parts);
        }
    }

    fn add_at(&mut self, limb: usize, parts: [u64; 2]) {
        let mut carry = false;
        for i in limb..LIMBS {
            let addend = parts.get(i - limb).copied().unwrap_or(0);
            let (partial, c1) = self.limbs[i].overflowing_add(addend);
            let (total, c2) = partial.overflowing_add(u64::from(carry));
            self.limbs[i] = total;
            carry = c1 || c2;
            if !carry && i > limb {
                break;
            }
        }
    }

    fn sub_at(&mut self, limb: usize, parts: [u64; 2]) {
        let mut borrow = false;
        for i in limb..LIMBS {
            let subtrahend = parts.get(i - limb).copied().unwrap_or(0);
            let (partial, b1) = self.limbs[i].overflowing_sub(subtrahend);
            let (total, b2) = partial.overflowing_sub(u64::from(borrow));
            self.limbs[i] = total;
            borrow = b1 || b2;
            if !borrow && i > limb {
                break;
            }
        }
    }

    /// The exact sum rounded to the nearest `f64` (ties to even).
    ///
    /// NaN if any input was NaN or both infinities were seen.
    pub fn value(&self) -> f64 {
        if self.nan || (self.pos_inf && self.neg_inf) {
            return f64::NAN;
        }
        if self.pos_inf {
            return f64::INFINITY;
        }
        if self.neg_inf {
            return f64::NEG_INFINITY;
        }
        let negative = self.limbs[LIMBS - 1] >> 63 == 1;
        let magnitude = if negative { negate(&self.limbs) } else { self.limbs };
        let rounded = round_to_f64(&magnitude);
        if negative {
            -rounded
        } else {
            rounded
        }
    }
}

fn negate(limbs: &[u64; LIMBS]) -> [u64; LIMBS] {
    let mut out = [0u64; LIMBS];
    let mut carry = true;
    for (dst, src) in out.iter_mut().zip(limbs.iter()) {
        let (v, c) = (!src).overflowing_add(u64::from(carry));
        *dst = v;
        carry = c;
    }
    out
}

fn round_to_f64(limbs: &[u64; LIMBS]) -> f64 {
    let Some(top) = highest_bit(limbs) else {
        return 0.0;
    };
    // Below 2^53 units the f64 bit pattern equals the magnitude itself
    // (subnormals, then the first binade of normals).
    if top <= 52 {
        return f64::from_bits(limbs[0]);
    }
    let mut lsb = top - 52;
    let mut mantissa = bits_at(limbs, lsb, 53);
    let round = bit_at(limbs, lsb - 1);
    let sticky = any_below(limbs, lsb - 1);
    if round && (sticky || mantissa & 1 == 1) {
        mantissa += 1;
        if mantissa == 1 << 53 {
            mantissa >>= 1;
            lsb += 1;
        }
    }
    let biased = u64::from(lsb) + 1;
    if biased >= 0x7ff {
        return f64::INFINITY;
    }
    f64::from_bits((biased << 52) | (mantissa & ((1u64 << 52) - 1)))
}

fn highest_bit(limbs: &[u64; LIMBS]) -> Option<u32> {
    limbs
        .iter()
        .enumerate()
        .rev()
        .find(|(_, limb)| **limb != 0)
        .map(|(i, limb)| i as u32 * 64 + 63 - limb.leading_zeros())
}

fn bit_at(limbs: &[u64; LIMBS], pos: u32) -> bool {
    (limbs[(pos / 64) as usize] >> (pos % 64)) & 1 == 1
}

fn bits_at(limbs: &[u64; LIMBS], lo: u32, count: u32) -> u64 {
    let idx = (lo / 64) as usize;
    let offset = lo % 64;
    let low = limbs[idx] >> offset;
    let high = match limbs.get(idx + 1) {
        Some(next) if offset > 0 => next << (64 - offset),
        _ => 0,
    };
    (low | high) & ((1u64 << count) - 1)
}

/// Whether any bit strictly below `pos` is set.
fn any_below(limbs: &[u64; LIMBS], pos: u32) -> bool {
    let idx = (pos / 64) as usize;
    let mask = (1u64 << (pos % 64)) - 1;
    limbs[idx] & mask != 0 || limbs[..idx].iter().any(|l| *l != 0)
}

/// Running sum over numeric datums, exact and independent of arrival order.
///
/// Integers and decimals add exactly; floats go to a [`FloatSum`]. Once a
/// float has contributed, the result is `Float64`.
#[derive(Debug, Clone, Default)]
pub struct NumericSum {
    exact: Option<Datum>,
    float: Option<FloatSum>,
}

impl NumericSum {
    /// Fold one value in; NULL is ignored. Returns `false` for a non-numeric
    /// value or an exact sum that no longer fits.
    pub fn add(&mut self, value: &Datum) -> bool {
        match value {
            Datum::Null => true,
            Datum::Float64(v) => {
                self.float.get_or_insert_with(FloatSum::new).add(*v);
                true
            }
            v if v.is_numeric() => {
                let next = match &self.exact {
                    None => Some(v.clone()),
                    Some(acc) => acc.add(v),
                };
                match next {
                    Some(sum) => {
                        self.exact = Some(sum);
                        true
                    }
                    None => false,
                }
            }
            _ => false,
        }
    }

    /// The total, or `None` if nothing was added.
    pub fn finish(self) -> Option<Datum> {
        match (self.exact, self.float) {
            (exact, None) => exact,
            (exact, Some(mut float)) => {
                if let Some(v) = exact.as_ref().and_then(Datum::as_f64) {
                    float.add(v);
                }
                Some(Datum::Float64(float.value()))
            }
        }
    }
}
