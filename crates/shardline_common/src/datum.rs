use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// A single scalar value flowing through routing conditions and shard results.
/// Small enum, no heap allocation for fixed-size types.
///
/// Equality follows SQL (`NULL != NULL`, `NaN != NaN`), so `Datum` is not
/// `Eq` or `Hash`. Use [`Datum::canonical_key`] as a map key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Datum {
    Null,
    Boolean(bool),
    Int32(i32),
    Int64(i64),
    Float64(f64),
    Text(String),
    Timestamp(i64), // microseconds since Unix epoch
    Date(i32),      // days since Unix epoch (1970-01-01)
    /// Fixed-point decimal: mantissa × 10^(-scale).
    /// e.g. Decimal(12345, 2) = 123.45
    Decimal(i128, u8),
    /// Value list shipped by a shard, e.g. its local DISTINCT set.
    Array(Vec<Datum>),
    Bytea(Vec<u8>),
}

impl Datum {
    pub fn is_null(&self) -> bool {
        matches!(self, Datum::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Datum::Int32(v) => Some(*v as i64),
            Datum::Int64(v) => Some(*v),
            Datum::Decimal(m, 0) => i64::try_from(*m).ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Datum::Int32(v) => Some(*v as f64),
            Datum::Int64(v) => Some(*v as f64),
            Datum::Float64(v) => Some(*v),
            Datum::Decimal(m, s) => {
                let (m, s) = decimal_trim(*m, *s);
                Some(m as f64 / 10f64.powi(i32::from(s)))
            }
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Datum::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Bit pattern of an integral value, as seen by BIT_XOR.
    /// Negative integers keep their two's complement bits.
    pub fn as_u64_bits(&self) -> Option<u64> {
        match self {
            Datum::Int32(v) => Some(*v as i64 as u64),
            Datum::Int64(v) => Some(*v as u64),
            Datum::Decimal(m, 0) if *m < 0 => i64::try_from(*m).ok().map(|v| v as u64),
            Datum::Decimal(m, 0) => u64::try_from(*m).ok(),
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Datum::Int32(_) | Datum::Int64(_) | Datum::Float64(_) | Datum::Decimal(_, _)
        )
    }

    /// Add two exact numerics (integers and decimals).
    ///
    /// Integer sums that overflow i64 are promoted to `Decimal` rather than
    /// wrapping. Returns `None` for floats, non-numeric operands, and decimal
    /// results that do not fit 128 bits.
    pub fn add(&self, other: &Datum) -> Option<Datum> {
        match (self, other) {
            (Datum::Int32(_) | Datum::Int64(_), Datum::Int32(_) | Datum::Int64(_)) => {
                let a = self.as_i64()?;
                let b = other.as_i64()?;
                Some(match a.checked_add(b) {
                    Some(v) => Datum::Int64(v),
                    None => Datum::Decimal(i128::from(a) + i128::from(b), 0),
                })
            }
            _ => {
                let (a, sa) = self.as_exact()?;
                let (b, sb) = other.as_exact()?;
                decimal_add(a, sa, b, sb)
            }
        }
    }

    /// `(mantissa, scale)` of an integer or decimal.
    fn as_exact(&self) -> Option<(i128, u8)> {
        match self {
            Datum::Int32(v) => Some((i128::from(*v), 0)),
            Datum::Int64(v) => Some((i128::from(*v), 0)),
            Datum::Decimal(m, s) => Some((*m, *s)),
            _ => None,
        }
    }

    /// Compare two numerics by exact value, across integer, decimal and
    /// float variants. `None` if either side is not numeric.
    ///
    /// Total over numerics: NaN sorts above every number and equal to
    /// itself, and `-0.0` equals `0.0`.
    pub fn numeric_cmp(&self, other: &Datum) -> Option<Ordering> {
        let ord = match (self, other) {
            (Datum::Float64(a), Datum::Float64(b)) => float_cmp(*a, *b),
            (Datum::Float64(a), b) => {
                let (m, s) = b.as_exact()?;
                exact_float_cmp(m, s, *a).reverse()
            }
            (a, Datum::Float64(b)) => {
                let (m, s) = a.as_exact()?;
                exact_float_cmp(m, s, *b)
            }
            (a, b) => {
                let (ma, sa) = a.as_exact()?;
                let (mb, sb) = b.as_exact()?;
                exact_cmp(ma, sa, mb, sb)
            }
        };
        Some(ord)
    }

    fn is_nan(&self) -> bool {
        matches!(self, Datum::Float64(v) if v.is_nan())
    }

    /// Divide a numeric sum by a row count (AVG finalization).
    ///
    /// Exact operands produce a `Decimal` with `scale` fractional digits,
    /// rounded half-up; float operands stay `Float64`. A zero count yields
    /// `None`.
    pub fn div_by_count(&self, count: i64, scale: u8) -> Option<Datum> {
        if count == 0 {
            return None;
        }
        match self {
            Datum::Float64(v) => Some(Datum::Float64(v / count as f64)),
            Datum::Int32(_) | Datum::Int64(_) => {
                decimal_div_half_up(self.as_i64()? as i128, 0, count as i128, scale)
            }
            Datum::Decimal(m, s) => decimal_div_half_up(*m, *s, count as i128, scale),
            _ => None,
        }
    }

    /// Canonical byte encoding used for DISTINCT deduplication and group keys.
    ///
    /// Values that compare equal across numeric types (`Int32(2)`, `Int64(2)`,
    /// `Decimal(200, 2)`, `Float64(2.0)`) encode to the same bytes.
    pub fn canonical_key(&self) -> Vec<u8> {
        let mut key = Vec::with_capacity(16);
        encode_canonical(&mut key, self);
        key
    }

}

fn encode_canonical(key: &mut Vec<u8>, datum: &Datum) {
    match datum {
        Datum::Null => key.push(0),
        Datum::Boolean(b) => {
            key.push(1);
            key.push(u8::from(*b));
        }
        Datum::Int32(_) | Datum::Int64(_) => {
            let v = datum.as_i64().unwrap_or_default();
            encode_exact(key, v as i128, 0);
        }
        Datum::Decimal(m, s) => encode_exact(key, *m, *s),
        Datum::Float64(v) => match float_as_exact(*v) {
            Some((m, s)) => encode_exact(key, m, s),
            None => {
                key.push(4);
                key.extend_from_slice(&v.to_be_bytes());
            }
        },
        Datum::Text(s) => {
            key.push(5);
            key.extend_from_slice(&(s.len() as u32).to_be_bytes());
            key.extend_from_slice(s.as_bytes());
        }
        Datum::Timestamp(v) => {
            key.push(6);
            key.extend_from_slice(&v.to_be_bytes());
        }
        Datum::Date(v) => {
            key.push(7);
            key.extend_from_slice(&v.to_be_bytes());
        }
        Datum::Array(elems) => {
            key.push(8);
            key.extend_from_slice(&(elems.len() as u32).to_be_bytes());
            for elem in elems {
                encode_canonical(key, elem);
            }
        }
        Datum::Bytea(bytes) => {
            key.push(9);
            key.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
            key.extend_from_slice(bytes);
        }
    }
}

fn encode_exact(key: &mut Vec<u8>, mantissa: i128, scale: u8) {
    let (m, s) = decimal_trim(mantissa, scale);
    key.push(3);
    key.push(s);
    key.extend_from_slice(&m.to_be_bytes());
}

impl fmt::Display for Datum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Datum::Null => write!(f, "NULL"),
            Datum::Boolean(b) => write!(f, "{}", b),
            Datum::Int32(v) => write!(f, "{}", v),
            Datum::Int64(v) => write!(f, "{}", v),
            Datum::Float64(v) => write!(f, "{}", v),
            Datum::Text(s) => write!(f, "{}", s),
            Datum::Timestamp(us) => {
                let secs = us.div_euclid(1_000_000);
                let nsecs = (us.rem_euclid(1_000_000) * 1000) as u32;
                match chrono::DateTime::from_timestamp(secs, nsecs) {
                    Some(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
                    None => write!(f, "{}", us),
                }
            }
            Datum::Date(days) => {
                let shifted = chrono::NaiveDate::from_ymd_opt(1970, 1, 1).and_then(|epoch| {
                    epoch.checked_add_signed(chrono::Duration::days(*days as i64))
                });
                match shifted {
                    Some(d) => write!(f, "{}", d.format("%Y-%m-%d")),
                    None => write!(f, "{}", days),
                }
            }
            Datum::Decimal(m, s) => write!(f, "{}", decimal_to_string(*m, *s)),
            Datum::Array(elems) => {
                write!(f, "{{")?;
                for (i, d) in elems.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}", d)?;
                }
                write!(f, "}}")
            }
            Datum::Bytea(bytes) => {
                write!(f, "\\x")?;
                for b in bytes {
                    write!(f, "{:02x}", b)?;
                }
                Ok(())
            }
        }
    }
}

impl PartialEq for Datum {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Datum::Null, Datum::Null) => false, // NULL != NULL in SQL
            (Datum::Boolean(a), Datum::Boolean(b)) => a == b,
            (Datum::Text(a), Datum::Text(b)) => a == b,
            (Datum::Timestamp(a), Datum::Timestamp(b)) => a == b,
            (Datum::Date(a), Datum::Date(b)) => a == b,
            (Datum::Bytea(a), Datum::Bytea(b)) => a == b,
            (Datum::Array(a), Datum::Array(b)) => {
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x == y)
            }
            (a, b) if a.is_nan() || b.is_nan() => false,
            (a, b) => a.numeric_cmp(b) == Some(Ordering::Equal),
        }
    }
}

impl PartialOrd for Datum {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Datum::Null, _) | (_, Datum::Null) => None,
            (Datum::Boolean(a), Datum::Boolean(b)) => a.partial_cmp(b),
            (Datum::Text(a), Datum::Text(b)) => a.partial_cmp(b),
            (Datum::Timestamp(a), Datum::Timestamp(b)) => a.partial_cmp(b),
            (Datum::Date(a), Datum::Date(b)) => a.partial_cmp(b),
            (Datum::Bytea(a), Datum::Bytea(b)) => a.partial_cmp(b),
            (a, b) if a.is_nan() || b.is_nan() => None,
            (a, b) => a.numeric_cmp(b),
        }
    }
}

/// A row is an ordered list of datums.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OwnedRow {
    pub values: Vec<Datum>,
}

impl OwnedRow {
    pub fn new(values: Vec<Datum>) -> Self {
        Self { values }
    }

    pub fn get(&self, idx: usize) -> Option<&Datum> {
        self.values.get(idx)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Display for OwnedRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, v) in self.values.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", v)?;
        }
        write!(f, ")")
    }
}

// ── Decimal helper functions ────────────────────────────────────────────

/// Convert a (mantissa, scale) decimal to its string representation.
/// e.g. (12345, 2) → "123.45", (-1, 3) → "-0.001", (100, 0) → "100"
pub fn decimal_to_string(mantissa: i128, scale: u8) -> String {
    if scale == 0 {
        return mantissa.to_string();
    }
    let negative = mantissa < 0;
    let s = mantissa.unsigned_abs().to_string();
    let scale = scale as usize;
    let result = if s.len() <= scale {
        format!("0.{}{}", "0".repeat(scale - s.len()), s)
    } else {
        let (int_part, frac_part) = s.split_at(s.len() - scale);
        format!("{}.{}", int_part, frac_part)
    };
    if negative {
        format!("-{}", result)
    } else {
        result
    }
}

/// `m × 10^by`, or `None` if it does not fit.
fn rescale(m: i128, by: u8) -> Option<i128> {
    if m == 0 || by == 0 {
        return Some(m);
    }
    10i128.checked_pow(u32::from(by)).and_then(|p| m.checked_mul(p))
}

/// Normalize two decimals to the larger scale.
fn decimal_normalize(a: i128, sa: u8, b: i128, sb: u8) -> Option<(i128, i128)> {
    if sa >= sb {
        Some((a, rescale(b, sa - sb)?))
    } else {
        Some((rescale(a, sb - sa)?, b))
    }
}

/// Add two decimals at the larger scale; `None` on overflow.
fn decimal_add(a: i128, sa: u8, b: i128, sb: u8) -> Option<Datum> {
    let (na, nb) = decimal_normalize(a, sa, b, sb)?;
    Some(Datum::Decimal(na.checked_add(nb)?, sa.max(sb)))
}

fn exact_cmp(a: i128, sa: u8, b: i128, sb: u8) -> Ordering {
    match decimal_normalize(a, sa, b, sb) {
        Some((na, nb)) => na.cmp(&nb),
        // The rescaled side overflowed, so its magnitude exceeds the other's.
        None if sa >= sb => 0.cmp(&b),
        None => a.cmp(&0),
    }
}

fn float_cmp(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
    }
}

// ── Exact numeric comparison ────────────────────────────────────────────

/// Split a finite float into `(negative, mantissa, exponent)` with
/// `|v| = mantissa × 2^exponent`.
pub fn float_parts(v: f64) -> (bool, u64, i32) {
    let bits = v.to_bits();
    let negative = bits >> 63 == 1;
    let biased = ((bits >> 52) & 0x7ff) as i32;
    let fraction = bits & ((1u64 << 52) - 1);
    if biased == 0 {
        (negative, fraction, -1074)
    } else {
        (negative, fraction | (1u64 << 52), biased - 1075)
    }
}

/// Exact decimal form of a float, when it fits `(i128, u8)`.
fn float_as_exact(v: f64) -> Option<(i128, u8)> {
    if !v.is_finite() {
        return None;
    }
    let (negative, mut mantissa, exponent) = float_parts(v);
    if mantissa == 0 {
        return Some((0, 0));
    }
    let magnitude = if exponent >= 0 {
        if exponent > 74 {
            return None;
        }
        (i128::from(mantissa) << exponent, 0u8)
    } else {
        let mut k = exponent.unsigned_abs();
        while k > 0 && mantissa % 2 == 0 {
            mantissa /= 2;
            k -= 1;
        }
        let scale = u8::try_from(k).ok()?;
        let m = 5i128.checked_pow(k)?.checked_mul(i128::from(mantissa))?;
        (m, scale)
    };
    let (m, s) = magnitude;
    Some((if negative { -m } else { m }, s))
}

/// Compare the decimal `m × 10^(-s)` with the float `v`, exactly.
fn exact_float_cmp(m: i128, s: u8, v: f64) -> Ordering {
    if v.is_nan() {
        return Ordering::Less;
    }
    if v.is_infinite() {
        return if v > 0.0 { Ordering::Less } else { Ordering::Greater };
    }
    let (negative, mantissa, exponent) = float_parts(v);
    let float_sign: i8 = match (mantissa, negative) {
        (0, _) => 0,
        (_, true) => -1,
        (_, false) => 1,
    };
    let exact_sign = m.signum() as i8;
    if exact_sign != float_sign || exact_sign == 0 {
        return exact_sign.cmp(&float_sign);
    }

    // |m| / 10^s  vs  mantissa × 2^exponent
    //   ⇔  |m|  vs  mantissa × 5^s × 2^(exponent + s)
    let mut lhs = Magnitude::from_u128(m.unsigned_abs());
    let mut rhs = Magnitude::from_u128(u128::from(mantissa));
    for _ in 0..s {
        rhs.mul_small(5);
    }
    let shift = exponent + i32::from(s);
    if shift >= 0 {
        rhs.shl(shift.unsigned_abs());
    } else {
        lhs.shl(shift.unsigned_abs());
    }
    let ord = lhs.compare(&rhs);
    if exact_sign > 0 {
        ord
    } else {
        ord.reverse()
    }
}

/// Unsigned big integer, little-endian `u64` limbs, no leading zero limbs.
struct Magnitude(Vec<u64>);

impl Magnitude {
    fn from_u128(v: u128) -> Self {
        let mut limbs = vec![v as u64, (v >> 64) as u64];
        while limbs.last() == Some(&0) {
            limbs.pop();
        }
        Magnitude(limbs)
    }

    fn mul_small(&mut self, k: u64) {
        let mut carry = 0u128;
        for limb in &mut self.0 {
            let product = u128::from(*limb) * u128::from(k) + carry;
            *limb = product as u64;
            carry = product >> 64;
        }
        if carry > 0 {
            self.0.push(carry as u64);
        }
    }

    fn shl(&mut self, bits: u32) {
        if self.0.is_empty() {
            return;
        }
        let offset = bits % 64;
        if offset > 0 {
            let mut carry = 0u64;
            for limb in &mut self.0 {
                let next = *limb >> (64 - offset);
                *limb = (*limb << offset) | carry;
                carry = next;
            }
            if carry > 0 {
                self.0.push(carry);
            }
        }
        let whole = (bits / 64) as usize;
        self.0.splice(0..0, std::iter::repeat(0).take(whole));
    }

    fn compare(&self, other: &Magnitude) -> Ordering {
        self.0
            .len()
            .cmp(&other.0.len())
            .then_with(|| self.0.iter().rev().cmp(other.0.iter().rev()))
    }
}

/// Remove trailing zeros from a decimal for canonical form.
fn decimal_trim(mut mantissa: i128, mut scale: u8) -> (i128, u8) {
    if mantissa == 0 {
        return (0, 0);
    }
    while scale > 0 && mantissa % 10 == 0 {
        mantissa /= 10;
        scale -= 1;
    }
    (mantissa, scale)
}

/// Divide `a × 10^(-sa)` by the integer `b`, rounding half-up (away from
/// zero) to `result_scale` digits.
pub fn decimal_div_half_up(a: i128, sa: u8, b: i128, result_scale: u8) -> Option<Datum> {
    if b == 0 {
        return None;
    }
    let target_scale = result_scale.max(sa);
    let scaled_a = a.checked_mul(10i128.checked_pow((target_scale - sa) as u32)?)?;
    let quotient = scaled_a / b;
    let remainder = scaled_a % b;
    let rounded = if remainder.unsigned_abs() * 2 >= b.unsigned_abs() {
        if (scaled_a < 0) != (b < 0) {
            quotient - 1
        } else {
            quotient + 1
        }
    } else {
        quotient
    };
    Some(Datum::Decimal(rounded, target_scale))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decimal_to_string() {
        assert_eq!(decimal_to_string(12345, 2), "123.45");
        assert_eq!(decimal_to_string(-1, 3), "-0.001");
        assert_eq!(decimal_to_string(100, 0), "100");
        assert_eq!(decimal_to_string(0, 2), "0.00");
    }

    #[test]
    fn test_int_add_promotes_on_overflow() {
        let sum = Datum::Int64(i64::MAX).add(&Datum::Int32(1)).unwrap();
        assert_eq!(sum, Datum::Decimal(i64::MAX as i128 + 1, 0));
        assert!(matches!(sum, Datum::Decimal(_, 0)));
    }

    #[test]
    fn test_mixed_add() {
        assert_eq!(Datum::Int32(2).add(&Datum::Int64(3)), Some(Datum::Int64(5)));
        assert_eq!(
            Datum::Decimal(150, 2).add(&Datum::Int64(1)),
            Some(Datum::Decimal(250, 2))
        );
        assert_eq!(Datum::Text("a".into()).add(&Datum::Int64(1)), None);
        assert_eq!(Datum::Float64(1.0).add(&Datum::Int64(1)), None);
    }

    #[test]
    fn test_decimal_add_overflow_is_none() {
        let big = Datum::Decimal(10i128.pow(30), 0);
        assert_eq!(big.add(&Datum::Decimal(1, 10)), None);
        assert_eq!(Datum::Decimal(i128::MAX, 0).add(&Datum::Int64(1)), None);
    }

    #[test]
    fn test_compare_across_overflowing_scales() {
        let big = Datum::Decimal(10i128.pow(30), 0);
        let tiny = Datum::Decimal(1, 10);
        assert_eq!(big.partial_cmp(&tiny), Some(Ordering::Greater));
        assert_eq!(tiny.partial_cmp(&big), Some(Ordering::Less));
        let neg = Datum::Decimal(-(10i128.pow(30)), 0);
        assert_eq!(neg.partial_cmp(&tiny), Some(Ordering::Less));
        assert_eq!(Datum::Decimal(5, 200).numeric_cmp(&Datum::Int64(0)), Some(Ordering::Greater));
    }

    #[test]
    fn test_exact_float_comparison() {
        // 2^53 + 1 is not representable as f64; the integer must still win.
        let int = Datum::Int64((1 << 53) + 1);
        let float = Datum::Float64((1u64 << 53) as f64);
        assert_eq!(int.numeric_cmp(&float), Some(Ordering::Greater));
        // f64 0.1 is slightly above the decimal 0.1.
        assert_eq!(Datum::Decimal(1, 1).numeric_cmp(&Datum::Float64(0.1)), Some(Ordering::Less));
        assert_eq!(Datum::Decimal(5, 1).numeric_cmp(&Datum::Float64(0.5)), Some(Ordering::Equal));
        assert_eq!(Datum::Float64(-1e300).numeric_cmp(&Datum::Int64(i64::MIN)), Some(Ordering::Less));
        assert_eq!(Datum::Float64(-0.0).numeric_cmp(&Datum::Int32(0)), Some(Ordering::Equal));
    }

    #[test]
    fn test_nan_ordering() {
        let nan = Datum::Float64(f64::NAN);
        assert_eq!(nan.numeric_cmp(&Datum::Float64(f64::INFINITY)), Some(Ordering::Greater));
        assert_eq!(nan.numeric_cmp(&Datum::Int64(5)), Some(Ordering::Greater));
        assert_eq!(Datum::Float64(-1.5).numeric_cmp(&nan), Some(Ordering::Less));
        assert_eq!(nan.partial_cmp(&Datum::Int64(1)), None);
        assert_ne!(nan, nan.clone());
    }

    #[test]
    fn test_div_by_count_rounds_half_up() {
        assert_eq!(
            Datum::Int64(30).div_by_count(5, 4),
            Some(Datum::Decimal(60000, 4))
        );
        // 2 / 3 = 0.66666.. → 0.6667
        assert_eq!(
            Datum::Int64(2).div_by_count(3, 4),
            Some(Datum::Decimal(6667, 4))
        );
        // -2 / 3 → -0.6667
        assert_eq!(
            Datum::Int64(-2).div_by_count(3, 4),
            Some(Datum::Decimal(-6667, 4))
        );
        assert_eq!(Datum::Int64(1).div_by_count(0, 4), None);
        assert_eq!(
            Datum::Float64(3.0).div_by_count(2, 4),
            Some(Datum::Float64(1.5))
        );
    }

    #[test]
    fn test_canonical_key_cross_type() {
        assert_eq!(Datum::Int32(2).canonical_key(), Datum::Int64(2).canonical_key());
        assert_eq!(Datum::Decimal(200, 2).canonical_key(), Datum::Int64(2).canonical_key());
        assert_eq!(Datum::Float64(2.0).canonical_key(), Datum::Int64(2).canonical_key());
        assert_eq!(Datum::Float64(0.25).canonical_key(), Datum::Decimal(25, 2).canonical_key());
        assert_eq!(Datum::Float64(-0.0).canonical_key(), Datum::Int64(0).canonical_key());
        assert_ne!(Datum::Float64(0.1).canonical_key(), Datum::Decimal(1, 1).canonical_key());
        assert_ne!(Datum::Text("2".into()).canonical_key(), Datum::Int64(2).canonical_key());
    }

    #[test]
    fn test_ordering() {
        assert!(Datum::Decimal(12345, 2) > Datum::Decimal(12344, 2));
        assert!(Datum::Decimal(100, 1) > Datum::Int64(9));
        assert!(Datum::Int32(3) < Datum::Float64(3.5));
        assert_eq!(Datum::Null.partial_cmp(&Datum::Int64(1)), None);
        assert_ne!(Datum::Null, Datum::Null);
    }

    #[test]
    fn test_bit_pattern() {
        assert_eq!(Datum::Int64(-1).as_u64_bits(), Some(u64::MAX));
        assert_eq!(Datum::Decimal(u64::MAX as i128, 0).as_u64_bits(), Some(u64::MAX));
        assert_eq!(Datum::Decimal(15, 1).as_u64_bits(), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(Datum::Date(0).to_string(), "1970-01-01");
        assert_eq!(Datum::Decimal(-1, 3).to_string(), "-0.001");
        assert_eq!(
            Datum::Array(vec![Datum::Int64(1), Datum::Text("a".into())]).to_string(),
            "{1,a}"
        );
    }
}
