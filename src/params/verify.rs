//! Verifiers for show parameters
//!
//! Each verifier checks one decoded value and returns a
//! [`ParameterError::Invalid`] naming the parameter when it does not fit.
//! The value's type is already enforced by decoding, so these only check
//! ranges and shapes.

use crate::color::Rgb;
use crate::error::ParameterError;

type Result = std::result::Result<(), ParameterError>;

/// Longest pause, hold or fade time a show accepts, in seconds
pub const MAX_DURATION_SEC: f64 = 86_400.0;

fn bounds_text(kind: &str, minimum: Option<f64>, maximum: Option<f64>) -> String {
    match (minimum, maximum) {
        (Some(min), Some(max)) => format!("must be {} between {} and {}", kind, min, max),
        (Some(min), None) => format!("must be {} >= {}", kind, min),
        (None, Some(max)) => format!("must be {} <= {}", kind, max),
        (None, None) => format!("must be {}", kind),
    }
}

/// A finite number within the closed range `[minimum, maximum]`
pub fn numeric(value: f64, name: &str, minimum: Option<f64>, maximum: Option<f64>) -> Result {
    let in_range = value.is_finite()
        && minimum.map_or(true, |min| value >= min)
        && maximum.map_or(true, |max| value <= max);
    if in_range {
        Ok(())
    } else {
        Err(ParameterError::invalid(
            name,
            bounds_text("a number", minimum, maximum),
            value,
        ))
    }
}

/// 0 or above
pub fn not_negative_numeric(value: f64, name: &str) -> Result {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ParameterError::invalid(
            name,
            "must be a non-negative number",
            value,
        ))
    }
}

/// Greater than 0
pub fn positive_numeric(value: f64, name: &str) -> Result {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ParameterError::invalid(name, "must be a positive number", value))
    }
}

/// A time span in seconds, between 0 and [`MAX_DURATION_SEC`]
pub fn duration_sec(value: f64, name: &str) -> Result {
    numeric(value, name, Some(0.0), Some(MAX_DURATION_SEC))
}

/// Like [`duration_sec`], but 0 is rejected
pub fn positive_duration_sec(value: f64, name: &str) -> Result {
    if value == 0.0 {
        return Err(ParameterError::invalid(
            name,
            bounds_text("a positive number", None, Some(MAX_DURATION_SEC)),
            value,
        ));
    }
    duration_sec(value, name)
}

/// An integer within the closed range `[minimum, maximum]`
pub fn integer(value: i64, name: &str, minimum: Option<i64>, maximum: Option<i64>) -> Result {
    if minimum.map_or(true, |min| value >= min) && maximum.map_or(true, |max| value <= max) {
        Ok(())
    } else {
        Err(ParameterError::invalid(
            name,
            bounds_text(
                "an integer",
                minimum.map(|m| m as f64),
                maximum.map(|m| m as f64),
            ),
            value,
        ))
    }
}

/// 0, 1, 2, ...
pub fn not_negative_integer(value: i64, name: &str) -> Result {
    if value >= 0 {
        Ok(())
    } else {
        Err(ParameterError::invalid(
            name,
            "must be a non-negative integer",
            value,
        ))
    }
}

/// 1, 2, 3, ...
pub fn positive_integer(value: i64, name: &str) -> Result {
    if value > 0 {
        Ok(())
    } else {
        Err(ParameterError::invalid(name, "must be a positive integer", value))
    }
}

/// Three components between 0 and 255
pub fn rgb_color(value: &Rgb, name: &str) -> Result {
    let (r, g, b) = *value;
    let valid = [r, g, b]
        .iter()
        .all(|c| c.is_finite() && (0.0..=255.0).contains(c));
    if valid {
        Ok(())
    } else {
        Err(ParameterError::invalid(
            name,
            "must be an RGB color tuple",
            format!("({}, {}, {})", r, g, b),
        ))
    }
}

/// Like [`rgb_color`] for a required color; an unset color is missing
pub fn required_rgb_color(value: &Option<Rgb>, name: &str) -> Result {
    match value {
        Some(color) => rgb_color(color, name),
        None => Err(ParameterError::missing(name)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_bounds() {
        assert!(numeric(5.0, "x", Some(0.0), Some(10.0)).is_ok());
        assert!(numeric(10.0, "x", Some(0.0), Some(10.0)).is_ok());
        assert!(numeric(-0.1, "x", Some(0.0), None).is_err());
        assert!(numeric(f64::NAN, "x", None, None).is_err());

        let err = numeric(11.0, "speed", Some(0.0), Some(10.0)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Parameter \"speed\" must be a number between 0 and 10 (got: 11)"
        );
    }

    #[test]
    fn test_sign_checks() {
        assert!(not_negative_numeric(0.0, "x").is_ok());
        assert!(positive_numeric(0.0, "x").is_err());
        assert!(not_negative_integer(0, "x").is_ok());
        assert!(not_negative_integer(-1, "x").is_err());
        assert!(positive_integer(1, "x").is_ok());
        assert!(positive_integer(0, "x").is_err());
        assert!(integer(3, "x", Some(1), Some(3)).is_ok());
        assert!(integer(4, "x", None, Some(3)).is_err());
    }

    #[test]
    fn test_durations_are_bounded() {
        assert!(duration_sec(0.0, "pause_sec").is_ok());
        assert!(duration_sec(MAX_DURATION_SEC, "pause_sec").is_ok());
        assert!(duration_sec(1e300, "pause_sec").is_err());
        assert!(duration_sec(f64::INFINITY, "pause_sec").is_err());
        assert!(duration_sec(-1.0, "pause_sec").is_err());

        assert!(positive_duration_sec(0.5, "hold_sec").is_ok());
        assert!(positive_duration_sec(0.0, "hold_sec").is_err());
        assert!(positive_duration_sec(1e300, "hold_sec").is_err());
    }

    #[test]
    fn test_rgb_color() {
        assert!(rgb_color(&(0.0, 128.0, 255.0), "color").is_ok());
        assert!(rgb_color(&(0.0, 256.0, 0.0), "color").is_err());
        assert!(rgb_color(&(-1.0, 0.0, 0.0), "color").is_err());
        assert_eq!(
            required_rgb_color(&None, "color"),
            Err(ParameterError::missing("color"))
        );
    }
}
