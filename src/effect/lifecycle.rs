use anyhow::Result;

pub const MIN_SAMPLE_RATE: f32 = 8_000.0;
pub const MAX_SAMPLE_RATE: f32 = 384_000.0;

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum LifecycleState {
    Unprepared,
    Prepared { sample_rate: f32 },
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unprepared => write!(f, "unprepared"),
            Self::Prepared { sample_rate } => write!(f, "prepared at {sample_rate} Hz"),
        }
    }
}

/// prepare/reset/destroy contract shared by effect and module instances.
///
/// `prepare` is the only call that may allocate. `reset` zeroes signal state
/// and is safe at any block boundary. `destroy` must leave the instance
/// indistinguishable from a freshly constructed one.
pub trait Lifecycle {
    fn prepare(&mut self, sample_rate: f32) -> Result<()>;

    fn reset(&mut self);

    fn destroy(&mut self);

    fn lifecycle_state(&self) -> LifecycleState;

    fn is_prepared(&self) -> bool {
        matches!(self.lifecycle_state(), LifecycleState::Prepared { .. })
    }
}

pub fn validate_sample_rate(sample_rate: f32) -> Result<()> {
    if !sample_rate.is_finite() || !(MIN_SAMPLE_RATE..=MAX_SAMPLE_RATE).contains(&sample_rate) {
        anyhow::bail!(
            "sample rate {sample_rate} outside supported range {MIN_SAMPLE_RATE}..={MAX_SAMPLE_RATE}"
        );
    }
    Ok(())
}
