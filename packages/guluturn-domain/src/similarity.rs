/// Cosine similarity clamped to `[-1, 1]`.
///
/// Returns `None` for empty vectors, mismatched dimensions, or a zero-norm side.
pub fn cosine_similarity(lhs: &[f32], rhs: &[f32]) -> Option<f32> {
	if lhs.is_empty() || lhs.len() != rhs.len() {
		return None;
	}

	let (dot, lhs_norm, rhs_norm) =
		lhs.iter().zip(rhs).fold((0.0_f32, 0.0_f32, 0.0_f32), |(dot, ln, rn), (l, r)| {
			(dot + l * r, ln + l * l, rn + r * r)
		});

	if lhs_norm <= f32::EPSILON || rhs_norm <= f32::EPSILON {
		return None;
	}

	Some((dot / (lhs_norm.sqrt() * rhs_norm.sqrt())).clamp(-1.0, 1.0))
}

/// Index and similarity of the candidate closest to `query`, skipping incomparable entries.
pub fn best_match<'a, I>(query: &[f32], candidates: I) -> Option<(usize, f32)>
where
	I: IntoIterator<Item = Option<&'a [f32]>>,
{
	let mut best: Option<(usize, f32)> = None;

	for (idx, candidate) in candidates.into_iter().enumerate() {
		let Some(similarity) = candidate.and_then(|vec| cosine_similarity(query, vec)) else {
			continue;
		};

		if best.is_none_or(|(_, current)| similarity > current) {
			best = Some((idx, similarity));
		}
	}

	best
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn identical_vectors_are_fully_similar() {
		let sim = cosine_similarity(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]).expect("Similarity.");

		assert!((sim - 1.0).abs() < 1e-6);
	}

	#[test]
	fn orthogonal_and_opposite_vectors() {
		assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), Some(0.0));
		assert_eq!(cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]), Some(-1.0));
	}

	#[test]
	fn incomparable_inputs_yield_none() {
		assert_eq!(cosine_similarity(&[], &[]), None);
		assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), None);
		assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), None);
	}

	#[test]
	fn best_match_skips_missing_vectors_and_keeps_first_maximum() {
		let a = [1.0_f32, 0.0];
		let b = [0.0_f32, 1.0];
		let c = [1.0_f32, 0.0];
		let candidates = [None, Some(&b[..]), Some(&a[..]), Some(&c[..])];
		let (idx, sim) = best_match(&[1.0, 0.0], candidates).expect("Best match.");

		assert_eq!(idx, 2);
		assert!((sim - 1.0).abs() < 1e-6);
		assert!(best_match(&[1.0, 0.0], [None, None]).is_none());
	}
}
