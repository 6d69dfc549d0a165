//! Contiguous serial number ranges
//!
//! A serial is a fixed textual prefix followed by a numeric suffix (its
//! maximal trailing run of ASCII digits). A range of `n` units starting at
//! `S` ends at `S + n - 1`, keeping at least the suffix width of `S`.

use std::cmp::Ordering;

use thiserror::Error;

/// Invalid input to the serial range computations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SerialRangeError {
    #[error("quantity must be at least 1")]
    ZeroQuantity,

    #[error("quantity must be a positive whole number")]
    InvalidQuantity,

    #[error("serial number {0:?} has no numeric suffix")]
    NoNumericSuffix(String),
}

/// An inclusive `[start, end]` serial range
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SerialRange {
    pub start: String,
    pub end: String,
}

impl SerialRange {
    /// The range of `quantity` units starting at `start`
    pub fn from_start(start: &str, quantity: u64) -> Result<Self, SerialRangeError> {
        Ok(Self {
            start: start.to_string(),
            end: compute_ending_serial(start, quantity)?,
        })
    }

    pub fn overlaps(&self, other: &SerialRange) -> bool {
        ranges_overlap(&self.start, &self.end, &other.start, &other.end)
    }
}

impl std::fmt::Display for SerialRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// Split a serial into its non-digit prefix and trailing digit run
pub fn split_serial(serial: &str) -> (&str, &str) {
    let digits = serial
        .bytes()
        .rev()
        .take_while(|b| b.is_ascii_digit())
        .count();
    serial.split_at(serial.len() - digits)
}

/// Ending serial of a range of `quantity` units starting at `start`
///
/// The suffix is re-padded to at least its original width and widens when the
/// sum overflows it (`"SN99"` + 2 units ends at `"SN100"`).
pub fn compute_ending_serial(start: &str, quantity: u64) -> Result<String, SerialRangeError> {
    if quantity == 0 {
        return Err(SerialRangeError::ZeroQuantity);
    }
    if quantity == 1 {
        return Ok(start.to_string());
    }

    let (prefix, digits) = split_serial(start);
    if digits.is_empty() {
        return Err(SerialRangeError::NoNumericSuffix(start.to_string()));
    }

    Ok(format!("{prefix}{}", add_to_digits(digits, quantity - 1)))
}

/// Whether `[a_start, a_end]` and `[b_start, b_end]` share at least one serial
///
/// Serials with different prefixes never overlap.
pub fn ranges_overlap(a_start: &str, a_end: &str, b_start: &str, b_end: &str) -> bool {
    let (a_prefix, a_first) = split_serial(a_start);
    let (b_prefix, b_first) = split_serial(b_start);
    if a_prefix != b_prefix {
        return false;
    }
    let (_, a_last) = split_serial(a_end);
    let (_, b_last) = split_serial(b_end);

    compare_digits(a_first, b_last) != Ordering::Greater
        && compare_digits(b_first, a_last) != Ordering::Greater
}

/// Whether `quantity` units starting at `first` end exactly at `last_expected`
pub fn is_sequential(first: &str, last_expected: &str, quantity: u64) -> bool {
    compute_ending_serial(first, quantity).is_ok_and(|end| end == last_expected)
}

/// First start inside `[first, first + available - 1]` where `wanted` units
/// fit without touching any of `taken`
pub fn next_free_serial_start(
    first: &str,
    available: u64,
    wanted: u64,
    taken: &[SerialRange],
) -> Option<String> {
    if wanted == 0 || wanted > available {
        return None;
    }
    for offset in 0..=(available - wanted) {
        let start = compute_ending_serial(first, offset + 1).ok()?;
        let candidate = SerialRange::from_start(&start, wanted).ok()?;
        if !taken.iter().any(|range| range.overlaps(&candidate)) {
            return Some(start);
        }
    }
    None
}

// ============================================================================
// Digit string arithmetic
// ============================================================================

/// Add `addend` to a decimal digit string, keeping leading zeros
fn add_to_digits(digits: &str, addend: u64) -> String {
    let mut out: Vec<u8> = Vec::with_capacity(digits.len() + 20);
    let mut carry = u128::from(addend);

    for b in digits.bytes().rev() {
        let value = u128::from(b - b'0') + carry;
        out.push(b'0' + (value % 10) as u8);
        carry = value / 10;
    }
    while carry > 0 {
        out.push(b'0' + (carry % 10) as u8);
        carry /= 10;
    }

    out.reverse();
    // Only ASCII digits were pushed
    String::from_utf8(out).unwrap_or_default()
}

/// Compare two digit strings numerically, at any length
fn compare_digits(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_serial() {
        assert_eq!(split_serial("SN0001"), ("SN", "0001"));
        assert_eq!(split_serial("A1B22"), ("A1B", "22"));
        assert_eq!(split_serial("ABC"), ("ABC", ""));
        assert_eq!(split_serial("123"), ("", "123"));
    }

    #[test]
    fn test_ending_serial_simple() {
        assert_eq!(compute_ending_serial("SN0001", 5).unwrap(), "SN0005");
    }

    #[test]
    fn test_ending_serial_keeps_width() {
        assert_eq!(compute_ending_serial("A0098", 5).unwrap(), "A0102");
    }

    #[test]
    fn test_ending_serial_widens() {
        assert_eq!(compute_ending_serial("SN99", 2).unwrap(), "SN100");
        assert_eq!(compute_ending_serial("X9999", 3).unwrap(), "X10001");
    }

    #[test]
    fn test_ending_serial_single_unit() {
        assert_eq!(compute_ending_serial("NODIGITS", 1).unwrap(), "NODIGITS");
    }

    #[test]
    fn test_ending_serial_rejects_bad_input() {
        assert_eq!(
            compute_ending_serial("SN0001", 0),
            Err(SerialRangeError::ZeroQuantity)
        );
        assert_eq!(
            compute_ending_serial("NODIGITS", 2),
            Err(SerialRangeError::NoNumericSuffix("NODIGITS".to_string()))
        );
    }

    #[test]
    fn test_ending_serial_long_suffix() {
        assert_eq!(
            compute_ending_serial("LOT99999999999999999999", 2).unwrap(),
            "LOT100000000000000000000"
        );
    }

    #[test]
    fn test_ranges_overlap() {
        assert!(ranges_overlap("SN0001", "SN0005", "SN0004", "SN0008"));
        assert!(ranges_overlap("SN0004", "SN0008", "SN0001", "SN0005"));
        assert!(ranges_overlap("SN0001", "SN0005", "SN0005", "SN0005"));
        assert!(!ranges_overlap("SN0001", "SN0005", "SN0006", "SN0010"));
    }

    #[test]
    fn test_ranges_with_different_prefix_never_overlap() {
        assert!(!ranges_overlap("SN0001", "SN0005", "XX0001", "XX0005"));
    }

    #[test]
    fn test_ranges_compare_numerically_across_widths() {
        assert!(ranges_overlap("SN98", "SN100", "SN0100", "SN0101"));
        assert!(!ranges_overlap("SN98", "SN99", "SN0100", "SN0101"));
    }

    #[test]
    fn test_is_sequential() {
        assert!(is_sequential("SN0001", "SN0005", 5));
        assert!(!is_sequential("SN0001", "SN0006", 5));
        assert!(!is_sequential("SN0001", "SN0005", 0));
    }

    #[test]
    fn test_next_free_serial_start() {
        let taken = vec![SerialRange::from_start("SN0001", 3).unwrap()];
        assert_eq!(
            next_free_serial_start("SN0001", 10, 2, &taken).as_deref(),
            Some("SN0004")
        );
        assert_eq!(next_free_serial_start("SN0001", 3, 2, &taken), None);
        assert_eq!(next_free_serial_start("SN0001", 3, 4, &[]), None);
    }
}
