//! Preprocessors normalizing wire representations before decoding

use crate::color::color_bytes_to_tuple;
use serde_json::Value;

/// Accept a color as `[r, g, b]`, packed `0xRRGGBB` integer or `"#rrggbb"`
///
/// Anything else is passed through unchanged and fails decoding later.
pub fn color_from_wire(value: Value) -> Value {
    let packed = match &value {
        Value::Number(n) => n.as_u64().filter(|v| *v <= 0xFF_FFFF),
        Value::String(s) => s
            .strip_prefix('#')
            .filter(|hex| hex.len() == 6)
            .and_then(|hex| u64::from_str_radix(hex, 16).ok()),
        _ => None,
    };

    match packed {
        Some(packed) => {
            let (r, g, b) = color_bytes_to_tuple(packed as u32);
            Value::from(vec![r, g, b])
        }
        None => value,
    }
}

/// Accept numbers sent as strings, e.g. from a console
pub fn number_from_string(value: Value) -> Value {
    if let Value::String(s) = &value {
        if let Ok(n) = s.trim().parse::<i64>() {
            return Value::from(n);
        }
        if let Ok(n) = s.trim().parse::<f64>() {
            return Value::from(n);
        }
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_color_formats() {
        assert_eq!(color_from_wire(json!([1, 2, 3])), json!([1, 2, 3]));
        assert_eq!(color_from_wire(json!(0x10_20_30)), json!([16, 32, 48]));
        assert_eq!(color_from_wire(json!("#ff8000")), json!([255, 128, 0]));
        assert_eq!(color_from_wire(json!("#ff80")), json!("#ff80"));
        assert_eq!(color_from_wire(json!(0x1_00_00_00)), json!(0x1_00_00_00));
    }

    #[test]
    fn test_number_from_string() {
        assert_eq!(number_from_string(json!("2.5")), json!(2.5));
        assert_eq!(number_from_string(json!(" 7 ")), json!(7));
        assert_eq!(number_from_string(json!("fast")), json!("fast"));
        assert_eq!(number_from_string(json!(3)), json!(3));
    }
}
