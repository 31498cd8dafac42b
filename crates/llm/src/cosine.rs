/// Compute cosine similarity between two embedding vectors.
///
/// Returns a value in `[-1.0, 1.0]` where `1.0` means identical direction.
/// Uses `f64` accumulators since embeddings are stored as `f64` blobs.
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
  if a.is_empty() || b.is_empty() || a.len() != b.len() {
    return 0.0;
  }

  let mut dot = 0.0_f64;
  let mut norm_a = 0.0_f64;
  let mut norm_b = 0.0_f64;

  for (&x, &y) in a.iter().zip(b.iter()) {
    dot = x.mul_add(y, dot);
    norm_a = x.mul_add(x, norm_a);
    norm_b = y.mul_add(y, norm_b);
  }

  let denom = norm_a.sqrt() * norm_b.sqrt();
  if denom < 1e-12 {
    return 0.0;
  }

  dot / denom
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn identical_vectors_are_similarity_one() {
    let v = [0.1, 0.2, 0.3];
    assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-9);
  }

  #[test]
  fn orthogonal_vectors_are_zero() {
    assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
  }

  #[test]
  fn mismatched_lengths_are_zero() {
    assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0]), 0.0);
  }
}
