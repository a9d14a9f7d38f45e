//! Color helpers
//!
//! Brightness correction for the LED duty cycle, packed 24-bit color
//! conversion, the classic color wheel and small vector helpers used by
//! the shows.

/// An RGB color with components from `0.0` to `255.0`
pub type Rgb = (f32, f32, f32);

pub const BLACK: Rgb = (0.0, 0.0, 0.0);

/// Correct the non-linear human perception of LED brightness (CIE 1931).
///
/// `lightness` is linear in `[0, max_in]`. It is mapped to `L*` in
/// `[0, 100]` and inverted with the simplified formula
///
/// ```text
/// Y = L* / 902.33            for L* <= 8
/// Y = ((L* + 16) / 116)^3    for L* >  8
/// ```
///
/// The result is `Y * max_out` rounded half to even.
pub fn grayscale_correction(lightness: f64, max_in: f64, max_out: u32) -> u32 {
    if lightness <= 0.0 {
        return 0;
    } else if lightness >= max_in {
        return max_out;
    }

    let l_star = lightness / max_in * 100.0;

    let duty_cycle = if l_star <= 8.0 {
        l_star / 902.33
    } else {
        ((l_star + 16.0) / 116.0).powi(3)
    };

    (duty_cycle * f64::from(max_out)).round_ties_even() as u32
}

/// Join an RGB triple into a 3-byte value, red in the most significant byte
pub fn color_tuple_to_bytes(red: u8, green: u8, blue: u8) -> u32 {
    (u32::from(red) << 16) | (u32::from(green) << 8) | u32::from(blue)
}

/// Split a 3-byte color value into its RGB triple
pub fn color_bytes_to_tuple(rgb_color: u32) -> (u8, u8, u8) {
    let r = ((rgb_color & 0xFF_0000) >> 16) as u8;
    let g = ((rgb_color & 0x00_FF00) >> 8) as u8;
    let b = (rgb_color & 0x00_00FF) as u8;
    (r, g, b)
}

/// Clamp a single color component to `[0, 255]`
pub fn clamp_component(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 255.0)
    }
}

/// Get a color from a color wheel: green -> red -> blue -> green
///
/// `wheel_pos` runs from 0 to 254, larger values are treated as 254.
pub fn wheel(wheel_pos: f32) -> Rgb {
    let mut pos = wheel_pos.min(254.0);
    if pos < 85.0 {
        (pos * 3.0, 255.0 - pos * 3.0, 0.0)
    } else if pos < 170.0 {
        pos -= 85.0;
        (255.0 - pos * 3.0, 0.0, pos * 3.0)
    } else {
        pos -= 170.0;
        (0.0, pos * 3.0, 255.0 - pos * 3.0)
    }
}

/// Multiply every component with `factor`
pub fn linear_dim(undimmed: Rgb, factor: f32) -> Rgb {
    (undimmed.0 * factor, undimmed.1 * factor, undimmed.2 * factor)
}

/// Component-wise sum of two colors
pub fn add_tuples(a: Rgb, b: Rgb) -> Rgb {
    (a.0 + b.0, a.1 + b.1, a.2 + b.2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_grayscale_endpoints() {
        assert_eq!(grayscale_correction(0.0, 255.0, 255), 0);
        assert_eq!(grayscale_correction(-3.0, 255.0, 255), 0);
        assert_eq!(grayscale_correction(255.0, 255.0, 255), 255);
        assert_eq!(grayscale_correction(300.0, 255.0, 255), 255);
        assert_eq!(grayscale_correction(1.0, 1.0, 31), 31);
    }

    #[test]
    fn test_grayscale_known_values() {
        // L* = 50 -> Y = (66/116)^3 = 0.18419 -> 46.97
        assert_eq!(grayscale_correction(127.5, 255.0, 255), 47);
        // L* = 8 stays on the linear branch: 8 / 902.33 * 255 = 2.26
        assert_eq!(grayscale_correction(20.4, 255.0, 255), 2);
        // half brightness on the 5-bit prefix scale: 0.18419 * 31 = 5.71
        assert_eq!(grayscale_correction(0.5, 1.0, 31), 6);
        // 0.75: L* = 75 -> (91/116)^3 = 0.48278 -> 14.97
        assert_eq!(grayscale_correction(0.75, 1.0, 31), 15);
    }

    #[test]
    fn test_wheel_segments() {
        assert_eq!(wheel(0.0), (0.0, 255.0, 0.0));
        assert_eq!(wheel(85.0), (255.0, 0.0, 0.0));
        assert_eq!(wheel(170.0), (0.0, 0.0, 255.0));
        assert_eq!(wheel(1000.0), wheel(254.0));
    }

    #[test]
    fn test_dim_and_add() {
        let half = linear_dim((200.0, 100.0, 50.0), 0.5);
        assert_eq!(half, (100.0, 50.0, 25.0));
        assert_eq!(add_tuples(half, (1.0, 2.0, 3.0)), (101.0, 52.0, 28.0));
    }

    #[test]
    fn test_clamp_component() {
        assert_eq!(clamp_component(-1.0), 0.0);
        assert_eq!(clamp_component(256.5), 255.0);
        assert_eq!(clamp_component(f32::NAN), 0.0);
        assert_eq!(clamp_component(12.5), 12.5);
    }

    proptest! {
        #[test]
        fn test_color_bytes_round_trip(r in any::<u8>(), g in any::<u8>(), b in any::<u8>()) {
            prop_assert_eq!(color_bytes_to_tuple(color_tuple_to_bytes(r, g, b)), (r, g, b));
        }

        #[test]
        fn test_grayscale_is_monotonic(
            a in 0.0f64..=255.0,
            b in 0.0f64..=255.0,
            max_out in prop::sample::select(vec![31u32, 255]),
        ) {
            let (low, high) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(grayscale_correction(low, 255.0, max_out) <= grayscale_correction(high, 255.0, max_out));
        }
    }
}
