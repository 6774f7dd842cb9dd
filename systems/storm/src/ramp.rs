/// Quintic smootherstep mapping normalised time-in-ramp onto `[0, 1]`.
///
/// Both the first and second derivatives vanish at the endpoints, so the
/// attenuated signal starts and stops moving without a visible kink.
#[must_use]
pub fn ramp(x: f64) -> f64 {
    if x <= 0.0 {
        0.0
    } else if x >= 1.0 {
        1.0
    } else {
        x * x * x * (x * (6.0 * x - 15.0) + 10.0)
    }
}
