//! Conversions from OOXML native units.

/// EMUs per logical inch.
pub const EMU_PER_INCH: i64 = 914_400;

/// Logical pixels per inch.
pub const DEFAULT_DPI: u32 = 96;

/// Rotation and gradient angles are stored in 60000ths of a degree.
const ANGLE_UNITS_PER_DEGREE: f64 = 60_000.0;

/// Convert EMUs to pixels at 96 DPI.
///
/// `length_to_px(914400) == 96`. Rounds half away from zero.
pub fn length_to_px(emu: i64) -> i64 {
    length_to_px_at(emu, DEFAULT_DPI)
}

/// Convert EMUs to pixels at an arbitrary DPI.
pub fn length_to_px_at(emu: i64, dpi: u32) -> i64 {
    (emu as f64 * f64::from(dpi) / EMU_PER_INCH as f64).round() as i64
}

/// Convert an OOXML angle (60000ths of a degree) to degrees.
pub fn angle_to_degrees(units: i64) -> f64 {
    units as f64 / ANGLE_UNITS_PER_DEGREE
}

/// Convert hundredths of a point (`sz="2400"`) to points.
pub fn hundredths_to_pt(value: i64) -> f64 {
    value as f64 / 100.0
}

/// Convert a thousandths-of-a-percent value (`pos="50000"`) to a 0–1 fraction.
pub fn fraction_from_thousandths(value: i64) -> f64 {
    value as f64 / 100_000.0
}

/// Format a number for CSS output: integers without a fraction, others with
/// at most two decimals and no trailing zeros.
pub fn format_number(value: f64) -> String {
    if !value.is_finite() {
        return "0".to_string();
    }
    let rounded = (value * 100.0).round() / 100.0;
    if rounded.fract() == 0.0 {
        format!("{}", rounded as i64)
    } else {
        let s = format!("{:.2}", rounded);
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_to_px_fixed_points() {
        assert_eq!(length_to_px(914_400), 96);
        assert_eq!(length_to_px(0), 0);
        assert_eq!(length_to_px(9_144_000), 960);
        assert_eq!(length_to_px(12_700), 1);
    }

    #[test]
    fn test_length_to_px_monotonic() {
        let mut previous = length_to_px(0);
        for emu in (0..2_000_000).step_by(4_763) {
            let px = length_to_px(emu);
            assert!(px >= previous);
            previous = px;
        }
    }

    #[test]
    fn test_length_to_px_at_custom_dpi() {
        assert_eq!(length_to_px_at(914_400, 72), 72);
        assert_eq!(length_to_px_at(457_200, 144), 72);
    }

    #[test]
    fn test_angle_to_degrees() {
        assert_eq!(angle_to_degrees(5_400_000), 90.0);
        assert_eq!(angle_to_degrees(0), 0.0);
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(12.0), "12");
        assert_eq!(format_number(12.5), "12.5");
        assert_eq!(format_number(0.333333), "0.33");
        assert_eq!(format_number(-45.0), "-45");
        assert_eq!(format_number(f64::NAN), "0");
    }
}
