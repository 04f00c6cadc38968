use super::ring::RingBuffer;

// FILTER COMPONENT ------------------------------------------------------------

/// Weighted trailing-window smoother: 30% of the weight on the incoming
/// sample, the remaining 70% spread equally over the `n_points` most recent
/// history slots. `n_points == 0` is a pass-through. The caller stores the
/// result; this function never writes to the buffer.
pub fn weighted_filter(history: &RingBuffer, cycle: usize, v: f64, n_points: usize) -> f64 {
    if n_points == 0 {
        return v;
    }

    let mut fv = v * 0.3;
    let perc = 0.7 / n_points as f64;
    for i in 1..=n_points {
        fv += history.lagged(cycle, i as isize) * perc;
    }
    fv
}

// SLOPE COMPONENT -------------------------------------------------------------

/// Two-tap slope estimate between the current sample `x1` and the lagged
/// sample `x2`, `dt` time units apart. The sign is inverted on purpose so a
/// rising voltage yields a positive slope; downstream crossing comparisons
/// rely on this convention.
pub fn slope(x1: f64, x2: f64, dt: f64) -> f64 {
    (x2 - x1) / -dt
}
