//! Numeric repair functions that sit between the renderers and the drawing
//! surface.
//!
//! Audio analysis feeds the effects with values that can be NaN or infinite
//! (silent buffers divided by zero, malformed samples), and resize races can
//! produce degenerate geometry. Everything here accepts arbitrary input and
//! returns a finite, range-correct value; nothing in this module can panic.

use crate::canvas::{Gradient, GradientStop};

/// Returns `value` when it is finite, otherwise the (repaired) fallback.
pub fn safe_number(value: f32, fallback: f32) -> f32 {
    if value.is_finite() {
        value
    } else if fallback.is_finite() {
        fallback
    } else {
        0.0
    }
}

/// Wraps a hue into `[0, 360)`. Non-finite hues become 0.
pub fn safe_hue(hue: f32) -> f32 {
    if !hue.is_finite() {
        return 0.0;
    }
    let wrapped = hue.rem_euclid(360.0);
    // rem_euclid can return exactly 360.0 when the input is a tiny negative.
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

/// Clamps a percentage (saturation, lightness) into `[0, 100]`.
pub fn safe_percent(value: f32) -> f32 {
    safe_number(value, 0.0).clamp(0.0, 100.0)
}

/// Clamps an alpha value into `[0, 1]`.
pub fn safe_alpha(value: f32) -> f32 {
    safe_number(value, 0.0).clamp(0.0, 1.0)
}

/// Clamps an RGB channel into `[0, 255]` and rounds to an integer.
pub fn safe_channel(value: f32) -> u8 {
    safe_number(value, 0.0).clamp(0.0, 255.0).round() as u8
}

/// Builds a linear gradient, or `None` when the endpoints coincide after
/// repair. Callers treat `None` as "skip this paint step".
pub fn linear_gradient(
    x0: f32,
    y0: f32,
    x1: f32,
    y1: f32,
    stops: Vec<GradientStop>,
) -> Option<Gradient> {
    let x0 = safe_number(x0, 0.0);
    let y0 = safe_number(y0, 0.0);
    let x1 = safe_number(x1, 0.0);
    let y1 = safe_number(y1, 0.0);
    if stops.is_empty() || (x0 == x1 && y0 == y1) {
        return None;
    }
    Some(Gradient::linear(x0, y0, x1, y1, sorted(stops)))
}

/// Builds a radial gradient, or `None` when the outer radius is non-positive
/// or non-finite.
pub fn radial_gradient(
    cx: f32,
    cy: f32,
    r0: f32,
    r1: f32,
    stops: Vec<GradientStop>,
) -> Option<Gradient> {
    if !r1.is_finite() || r1 <= 0.0 || stops.is_empty() {
        return None;
    }
    let cx = safe_number(cx, 0.0);
    let cy = safe_number(cy, 0.0);
    let r0 = safe_number(r0, 0.0).clamp(0.0, r1);
    Some(Gradient::radial(cx, cy, r0, r1, sorted(stops)))
}

fn sorted(mut stops: Vec<GradientStop>) -> Vec<GradientStop> {
    for stop in &mut stops {
        stop.offset = safe_alpha(stop.offset);
    }
    stops.sort_by(|a, b| a.offset.total_cmp(&b.offset));
    stops
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::Rgba;

    const BAD: [f32; 3] = [f32::NAN, f32::INFINITY, f32::NEG_INFINITY];

    fn stops() -> Vec<GradientStop> {
        vec![
            GradientStop::new(0.0, Rgba::new(255, 0, 0, 1.0)),
            GradientStop::new(1.0, Rgba::new(0, 0, 255, 1.0)),
        ]
    }

    #[test]
    fn safe_number_repairs_non_finite() {
        for bad in BAD {
            assert_eq!(safe_number(bad, 7.5), 7.5);
            assert_eq!(safe_number(bad, f32::NAN), 0.0);
        }
        assert_eq!(safe_number(-3.25, 0.0), -3.25);
    }

    #[test]
    fn safe_hue_wraps_into_domain() {
        assert_eq!(safe_hue(0.0), 0.0);
        assert_eq!(safe_hue(360.0), 0.0);
        assert_eq!(safe_hue(540.0), 180.0);
        assert_eq!(safe_hue(-90.0), 270.0);
        for bad in BAD {
            assert_eq!(safe_hue(bad), 0.0);
        }
        for h in [-720.5, -0.001, 123.4, 719.9] {
            let out = safe_hue(h);
            assert!((0.0..360.0).contains(&out), "hue {h} wrapped to {out}");
        }
    }

    #[test]
    fn percent_alpha_channel_stay_in_domain() {
        for bad in BAD {
            assert_eq!(safe_percent(bad), 0.0);
            assert_eq!(safe_alpha(bad), 0.0);
            assert_eq!(safe_channel(bad), 0);
        }
        assert_eq!(safe_percent(150.0), 100.0);
        assert_eq!(safe_percent(-5.0), 0.0);
        assert_eq!(safe_alpha(2.0), 1.0);
        assert_eq!(safe_alpha(-1.0), 0.0);
        assert_eq!(safe_channel(300.0), 255);
        assert_eq!(safe_channel(-20.0), 0);
        assert_eq!(safe_channel(127.6), 128);
    }

    #[test]
    fn degenerate_linear_gradients_return_none() {
        assert!(linear_gradient(10.0, 10.0, 10.0, 10.0, stops()).is_none());
        assert!(linear_gradient(f32::NAN, 0.0, f32::NAN, 0.0, stops()).is_none());
        assert!(linear_gradient(0.0, 0.0, 1.0, 1.0, Vec::new()).is_none());
        assert!(linear_gradient(0.0, 0.0, 100.0, 0.0, stops()).is_some());
    }

    #[test]
    fn degenerate_radial_gradients_return_none() {
        assert!(radial_gradient(0.0, 0.0, 0.0, 0.0, stops()).is_none());
        assert!(radial_gradient(0.0, 0.0, 0.0, -4.0, stops()).is_none());
        assert!(radial_gradient(0.0, 0.0, 0.0, f32::NAN, stops()).is_none());
        assert!(radial_gradient(0.0, 0.0, 5.0, 50.0, stops()).is_some());
    }

    #[test]
    fn radial_inner_radius_is_clamped_to_outer() {
        let gradient = radial_gradient(0.0, 0.0, 90.0, 30.0, stops()).unwrap();
        match gradient {
            Gradient::Radial { r0, r1, .. } => {
                assert!(r0 <= r1);
            }
            _ => panic!("expected radial gradient"),
        }
    }
}
