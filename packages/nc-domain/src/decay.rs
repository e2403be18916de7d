/// Multiplier applied to a value after `elapsed_s` seconds under half-life `half_life_s`.
///
/// Negative elapsed time (a record stamped after `now`) counts as no elapsed time.
pub fn half_life_factor(elapsed_s: f64, half_life_s: f64) -> f64 {
	if half_life_s.is_nan() || half_life_s <= 0.0 {
		return 0.0;
	}

	let elapsed_s = if elapsed_s.is_finite() { elapsed_s.max(0.0) } else { f64::INFINITY };

	0.5_f64.powf(elapsed_s / half_life_s)
}

/// Exposure penalty multiplier, clamped to `[0, 1]`.
pub fn exposure_multiplier(exposures: f64, penalty: f64) -> f64 {
	(1.0 - penalty * exposures).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn one_half_life_halves() {
		assert_eq!(half_life_factor(0.0, 10.0), 1.0);
		assert!((half_life_factor(10.0, 10.0) - 0.5).abs() < 1e-12);
		assert!((half_life_factor(30.0, 10.0) - 0.125).abs() < 1e-12);
	}

	#[test]
	fn future_timestamps_do_not_amplify() {
		assert_eq!(half_life_factor(-100.0, 10.0), 1.0);
	}

	#[test]
	fn exposure_multiplier_never_goes_negative() {
		assert_eq!(exposure_multiplier(0.0, 0.5), 1.0);
		assert_eq!(exposure_multiplier(1.0, 0.5), 0.5);
		assert_eq!(exposure_multiplier(5.0, 0.5), 0.0);
	}
}
