//! Term encodings for the fixed engine schema.
//!
//! All dynamic fields share two raw string columns. A term is prefixed by
//! its field name and a NUL separator so that different fields never
//! collide:
//!
//! ```text
//! _terms   <field>\0<value>
//! _points  <field>\0<kind><16 hex digits>
//! ```
//!
//! Point payloads are mapped to `u64` so that unsigned order equals numeric
//! order, then written as fixed-width lowercase hex. Lexicographic order on
//! the key is therefore numeric order within a `(field, kind)` prefix.

use crate::field::PointValue;

const SEPARATOR: char = '\u{0}';
const SIGN_BIT: u64 = 1 << 63;

pub(crate) fn term_key(field: &str, value: &str) -> String {
    let mut key = String::with_capacity(field.len() + value.len() + 1);
    key.push_str(field);
    key.push(SEPARATOR);
    key.push_str(value);
    key
}

pub(crate) fn point_key(field: &str, value: PointValue) -> String {
    let (kind, bits) = match value {
        PointValue::Int(v) => ('i', sortable_i64(i64::from(v))),
        PointValue::Long(v) => ('l', sortable_i64(v)),
        PointValue::Float(v) => ('f', sortable_f64(f64::from(v))),
        PointValue::Double(v) => ('d', sortable_f64(v)),
    };
    format!("{field}{SEPARATOR}{kind}{bits:016x}")
}

fn sortable_i64(value: i64) -> u64 {
    (value as u64) ^ SIGN_BIT
}

fn sortable_f64(value: f64) -> u64 {
    let bits = value.to_bits();
    if bits & SIGN_BIT != 0 {
        !bits
    } else {
        bits | SIGN_BIT
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn term_keys_are_field_scoped() {
        assert_ne!(term_key("a", "bc"), term_key("ab", "c"));
        assert!(term_key("category", "Tech").starts_with("category\u{0}"));
    }

    #[test]
    fn kinds_do_not_collide() {
        assert_ne!(
            point_key("n", PointValue::Int(1)),
            point_key("n", PointValue::Long(1))
        );
    }

    #[test]
    fn negative_floats_sort_below_positive() {
        let neg = point_key("x", PointValue::Double(-0.5));
        let zero = point_key("x", PointValue::Double(0.0));
        let pos = point_key("x", PointValue::Double(0.5));
        assert!(neg < zero && zero < pos);
    }

    proptest! {
        #[test]
        fn long_order_is_preserved(a in any::<i64>(), b in any::<i64>()) {
            let ka = point_key("p", PointValue::Long(a));
            let kb = point_key("p", PointValue::Long(b));
            prop_assert_eq!(a.cmp(&b), ka.cmp(&kb));
        }

        #[test]
        fn double_order_is_preserved(a in -1.0e12f64..1.0e12, b in -1.0e12f64..1.0e12) {
            let ka = point_key("p", PointValue::Double(a));
            let kb = point_key("p", PointValue::Double(b));
            prop_assert_eq!(a.partial_cmp(&b).unwrap(), ka.cmp(&kb));
        }
    }
}
