//! Human-readable order number generation.
//!
//! Order numbers look like `ORD-MB3K2F1A-7QX4Z`: a base-36 encoding of the
//! creation time in milliseconds, then a short random suffix, both in an
//! uppercase alphanumeric alphabet. The time component makes numbers sort
//! roughly by creation and keeps the collision window to a single
//! millisecond; the suffix covers bursts within it. The orders table also
//! carries a UNIQUE constraint as the final guard.

use std::sync::atomic::{AtomicI64, Ordering};

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Alphabet for the random suffix (uppercase base 36).
const SUFFIX_ALPHABET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Length of the random suffix.
const SUFFIX_LEN: usize = 5;

/// Last time component handed out, for strict monotonicity within a process.
static LAST_MILLIS: AtomicI64 = AtomicI64::new(0);

/// A generated order number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderNumber(String);

impl OrderNumber {
    /// Generate an order number for the current instant.
    ///
    /// The time component is strictly monotonic within a process: a burst of
    /// calls inside one millisecond each get a distinct component, so two
    /// generations can never share both the time component and the suffix.
    #[must_use]
    pub fn generate() -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        // fetch_update returns the previous value; recompute what was stored.
        let millis = LAST_MILLIS
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now.max(last + 1))
            })
            .map_or(now, |prev| now.max(prev + 1));
        Self::from_parts(millis, &mut rand::thread_rng())
    }

    /// Generate from an explicit timestamp and RNG. Used by tests to pin the
    /// time component.
    #[must_use]
    pub fn from_parts<R: Rng>(timestamp_millis: i64, rng: &mut R) -> Self {
        let mut suffix = [0u8; SUFFIX_LEN];
        for byte in &mut suffix {
            *byte = SUFFIX_ALPHABET[rng.gen_range(0..SUFFIX_ALPHABET.len())];
        }
        // Alphabet is ASCII, so this cannot fail
        let suffix = core::str::from_utf8(&suffix).unwrap_or("00000");

        Self(format!(
            "ORD-{}-{suffix}",
            encode_base36(timestamp_millis.max(0).unsigned_abs())
        ))
    }

    /// Returns the order number as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the `OrderNumber` and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl std::fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for OrderNumber {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Encode an unsigned integer in uppercase base 36.
fn encode_base36(mut value: u64) -> String {
    if value == 0 {
        return "0".to_owned();
    }

    let mut digits = Vec::new();
    while value > 0 {
        #[allow(clippy::cast_possible_truncation)]
        let digit = (value % 36) as usize;
        digits.push(SUFFIX_ALPHABET[digit]);
        value /= 36;
    }
    digits.reverse();
    String::from_utf8(digits).unwrap_or_default()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_shape() {
        let number = OrderNumber::generate();
        let parts: Vec<&str> = number.as_str().split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "ORD");
        assert_eq!(parts[2].len(), SUFFIX_LEN);
        assert!(
            number
                .as_str()
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '-')
        );
    }

    #[test]
    fn test_encode_base36() {
        assert_eq!(encode_base36(0), "0");
        assert_eq!(encode_base36(35), "Z");
        assert_eq!(encode_base36(36), "10");
        assert_eq!(encode_base36(36 * 36), "100");
    }

    #[test]
    fn test_time_component_orders() {
        let mut rng = rand::thread_rng();
        let earlier = OrderNumber::from_parts(1_000_000_000_000, &mut rng);
        let later = OrderNumber::from_parts(2_000_000_000_000, &mut rng);
        // Same base-36 width at these magnitudes, so string order matches
        // time order.
        assert!(earlier.as_str() < later.as_str());
    }

    #[test]
    fn test_no_collisions_across_rapid_generation() {
        // 10,000 rapid successive generations must all be distinct.
        let mut seen = HashSet::with_capacity(10_000);
        for _ in 0..10_000 {
            assert!(seen.insert(OrderNumber::generate().into_inner()));
        }
    }
}
