use std::cmp::Ordering;

pub fn l2_norm(vector: &[f32]) -> f32 {
	vector.iter().map(|value| value * value).sum::<f32>().sqrt()
}

pub fn is_zero(vector: &[f32]) -> bool {
	vector.iter().all(|value| *value == 0.0)
}

/// Returns a unit-length copy of `vector`. Zero-norm (or non-finite norm) input yields the zero
/// vector of the same length.
pub fn normalize(vector: &[f32]) -> Vec<f32> {
	let norm = l2_norm(vector);

	if norm > 0.0 && norm.is_finite() {
		vector.iter().map(|value| value / norm).collect()
	} else {
		vec![0.0; vector.len()]
	}
}

/// Truncates or zero-pads `vector` to `dim` entries.
pub fn reconcile_dimension(vector: &[f32], dim: usize) -> Vec<f32> {
	let mut out = Vec::with_capacity(dim);

	out.extend(vector.iter().take(dim).copied());
	out.resize(dim, 0.0);

	out
}

pub fn dot(lhs: &[f32], rhs: &[f32]) -> f32 {
	lhs.iter().zip(rhs.iter()).map(|(l, r)| l * r).sum()
}

/// Cosine similarity of `query` against every row of `docs`.
///
/// The query is truncated or zero-padded to each row's length before comparison. Rows or
/// queries with zero norm score `0.0`.
pub fn cosine_similarities(query: &[f32], docs: &[Vec<f32>]) -> Vec<f32> {
	let mut query_dim: Option<usize> = None;
	let mut query_unit: Vec<f32> = Vec::new();
	let mut out = Vec::with_capacity(docs.len());

	for row in docs {
		if query_dim != Some(row.len()) {
			query_unit = normalize(&reconcile_dimension(query, row.len()));
			query_dim = Some(row.len());
		}

		out.push(dot(&query_unit, &normalize(row)).clamp(-1.0, 1.0));
	}

	out
}

/// Descending order with NaN sorted last.
pub fn cmp_f32_desc(a: f32, b: f32) -> Ordering {
	match (a.is_nan(), b.is_nan()) {
		(true, true) => Ordering::Equal,
		(true, false) => Ordering::Greater,
		(false, true) => Ordering::Less,
		(false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn normalize_leaves_zero_vectors_untouched() {
		assert_eq!(normalize(&[3.0, 4.0]), vec![0.6, 0.8]);
		assert_eq!(normalize(&[0.0, 0.0]), vec![0.0, 0.0]);
	}

	#[test]
	fn reconcile_truncates_and_pads() {
		assert_eq!(reconcile_dimension(&[1.0, 2.0, 3.0], 2), vec![1.0, 2.0]);
		assert_eq!(reconcile_dimension(&[1.0], 3), vec![1.0, 0.0, 0.0]);
	}

	#[test]
	fn nan_sorts_after_numbers() {
		let mut values = vec![0.2, f32::NAN, 0.9, -1.0];

		values.sort_by(|a, b| cmp_f32_desc(*a, *b));

		assert_eq!(&values[..3], &[0.9, 0.2, -1.0]);
		assert!(values[3].is_nan());
	}
}
