/// Scale `v` to unit length in place. A zero vector is left unchanged.
pub fn l2_normalize(v: &mut [f32]) {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

pub fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Map the squared distance between two unit vectors onto a score in `[0, 1]`.
///
/// For unit vectors `d = 2 - 2cos`, so `1 - d/2` is the cosine similarity;
/// directions more than 90° apart clamp to 0.
pub fn distance_to_score(squared_distance: f32) -> f32 {
    (1.0 - squared_distance / 2.0).clamp(0.0, 1.0)
}
