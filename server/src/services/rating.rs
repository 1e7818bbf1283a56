// hearth-server/src/services/rating.rs

/// Product rating from the mean of its review scores: clamped to `[0, 5]`
/// and rounded to two places, or `0.0` when there are no reviews.
pub fn aggregate(mean: Option<f64>) -> f64 {
  match mean {
    Some(m) if m.is_finite() => (m.clamp(0.0, 5.0) * 100.0).round() / 100.0,
    _ => 0.0,
  }
}
