/// Converts a nearest-neighbor distance into a similarity in `(0, 1]`.
///
/// Lower distances map to higher similarity. A missing or non-finite distance yields `None`
/// rather than zero. Negative distances are clamped to zero.
pub fn from_distance(distance: Option<f32>) -> Option<f64> {
	let distance = distance.filter(|value| value.is_finite())?;

	Some(1.0 / (1.0 + f64::from(distance.max(0.0))))
}

pub fn round3(value: f64) -> f64 {
	(value * 1_000.0).round() / 1_000.0
}
