use anyhow::Result;

use super::int_histogram::IntHistogram;
use crate::tuple::value::CompareOp;

const MIN_STRING: &str = "";
const MAX_STRING: &str = "zzzz";

/// Folds the first four bytes of a string into an integer key, byte i landing
/// in bits 8 * (3 - i). Keys are clamped into the range spanned by the empty
/// string and "zzzz", so ordering is preserved for short ASCII strings and
/// everything else degrades gracefully to the range boundaries.
fn string_to_key(s: &str) -> i32 {
    fold(s).clamp(fold(MIN_STRING), fold(MAX_STRING)) as i32
}

fn fold(s: &str) -> i64 {
    let mut key: i64 = 0;
    let bytes = s.as_bytes();
    for i in 0..4 {
        key <<= 8;
        if let Some(byte) = bytes.get(i) {
            key += *byte as i64;
        }
    }
    key
}

/// A histogram over one text column: strings are mapped to integer keys and
/// counted by an `IntHistogram` over the key range.
pub struct StringHistogram {
    histogram: IntHistogram,
}

impl StringHistogram {
    pub fn new(buckets: usize) -> Result<Self> {
        let histogram = IntHistogram::new(
            buckets,
            string_to_key(MIN_STRING),
            string_to_key(MAX_STRING),
        )?;
        Ok(Self { histogram })
    }

    pub fn add_value(&mut self, s: &str) -> Result<()> {
        self.histogram.add_value(string_to_key(s))
    }

    pub fn estimate_selectivity(&self, op: CompareOp, s: &str) -> f64 {
        self.histogram.estimate_selectivity(op, string_to_key(s))
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;

    use super::{string_to_key, StringHistogram};
    use crate::tuple::value::CompareOp;

    #[test]
    fn keys_preserve_lexicographic_order_of_short_ascii() {
        assert!(string_to_key("") < string_to_key("a"));
        assert!(string_to_key("a") < string_to_key("b"));
        assert!(string_to_key("a") < string_to_key("aa"));
        assert!(string_to_key("abc") < string_to_key("abd"));
        assert_eq!(string_to_key("abcd"), string_to_key("abcde"));
        assert!(string_to_key("zzzz") >= string_to_key("anything"));
    }

    #[test]
    fn selectivities_reflect_the_recorded_strings() -> Result<()> {
        let mut histogram = StringHistogram::new(100)?;
        for s in ["apple", "banana", "cherry", "date", "elderberry"] {
            histogram.add_value(s)?;
        }

        let eq = histogram.estimate_selectivity(CompareOp::Equals, "banana");
        assert!(eq > 0.0 && eq <= 1.0);

        // everything recorded is smaller than "zzzz"
        let lt_all = histogram.estimate_selectivity(CompareOp::LessThan, "zzzz");
        assert!((lt_all - 1.0).abs() < 0.05);

        // and nothing is smaller than the empty string
        let lt_none = histogram.estimate_selectivity(CompareOp::LessThan, "");
        assert!(lt_none.abs() < 1e-9);
        Ok(())
    }
}
