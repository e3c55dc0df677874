/// Convert decibels to linear amplitude.
#[inline]
pub fn db_to_lin(db: f32) -> f32 {
    10f32.powf(db / 20.0)
}

/// Convert linear amplitude to decibels, floored at -120 dB.
#[inline]
pub fn lin_to_db(lin: f32) -> f32 {
    if lin <= 1e-6 {
        -120.0
    } else {
        20.0 * lin.log10()
    }
}

/// Calculate a one-pole smoothing coefficient from a time constant in milliseconds.
///
/// Returns `exp(-1 / (sample_rate * time_ms * 0.001))`.
/// Used for attack/release envelopes and parameter smoothing.
#[inline]
pub fn calculate_coefficient(time_ms: f32, sample_rate: f32) -> f32 {
    (-1.0 / (sample_rate * 0.001 * time_ms.max(1e-3))).exp()
}

/// Milliseconds to a fractional sample count.
#[inline]
pub fn ms_to_samples(time_ms: f32, sample_rate: f32) -> f32 {
    time_ms * sample_rate / 1000.0
}

/// Final numeric-safety pass: non-finite samples become silence and everything
/// else is clamped to [-1, 1].
#[inline]
pub fn sanitize(sample: f32) -> f32 {
    if sample.is_finite() {
        sample.clamp(-1.0, 1.0)
    } else {
        0.0
    }
}

pub fn sanitize_block(samples: &mut [f32]) {
    for s in samples.iter_mut() {
        *s = sanitize(*s);
    }
}

/// Flush values too small to matter to zero so feedback paths never sit in
/// denormal territory.
#[inline]
pub fn flush_denormal(value: f32) -> f32 {
    if value.abs() < 1e-20 { 0.0 } else { value }
}

/// Largest feedback gain any recirculating path is allowed to reach.
pub const FEEDBACK_LIMIT: f32 = 0.9;

/// Scale a feedback amount so its magnitude never exceeds [`FEEDBACK_LIMIT`].
#[inline]
pub fn limit_feedback(feedback: f32) -> f32 {
    feedback * (FEEDBACK_LIMIT / feedback.abs()).min(1.0)
}

/// Linear crossfade between dry and wet.
#[inline]
pub fn mix(dry: f32, wet: f32, amount: f32) -> f32 {
    (1.0 - amount).mul_add(dry, amount * wet)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn db_conversions_round_trip_common_values() {
        assert!((db_to_lin(0.0) - 1.0).abs() < 1e-6);
        assert!((db_to_lin(-6.0) - 0.501).abs() < 1e-3);
        assert!((lin_to_db(0.5) + 6.02).abs() < 1e-2);
        assert_eq!(lin_to_db(0.0), -120.0);
    }

    #[test]
    fn sanitize_handles_non_finite_and_overs() {
        assert_eq!(sanitize(f32::NAN), 0.0);
        assert_eq!(sanitize(f32::INFINITY), 0.0);
        assert_eq!(sanitize(f32::NEG_INFINITY), 0.0);
        assert_eq!(sanitize(1.5), 1.0);
        assert_eq!(sanitize(-3.0), -1.0);
        assert_eq!(sanitize(0.25), 0.25);
    }

    #[test]
    fn coefficient_is_stable_for_zero_time() {
        let c = calculate_coefficient(0.0, 48_000.0);
        assert!(c.is_finite());
        assert!((0.0..1.0).contains(&c));
    }

    #[test]
    fn feedback_limiter_only_touches_large_values() {
        assert_eq!(limit_feedback(0.3), 0.3);
        assert_eq!(limit_feedback(0.0), 0.0);
        assert!((limit_feedback(0.95) - FEEDBACK_LIMIT).abs() < 1e-6);
        assert!((limit_feedback(-0.95) + FEEDBACK_LIMIT).abs() < 1e-6);
    }

    #[test]
    fn ms_to_samples_is_exact_for_whole_values() {
        assert_eq!(ms_to_samples(10.0, 48_000.0), 480.0);
        assert_eq!(ms_to_samples(1.0, 44_100.0), 44.1);
    }
}
