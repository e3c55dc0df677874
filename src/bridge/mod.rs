//! Cross-thread adapter between a control context and the real-time audio
//! context.
//!
//! [`bridge`] returns a pair: the [`BridgeHandle`] stays on the control side,
//! the [`BridgeProcessor`] moves to the audio thread and is pulled once per
//! quantum. They share nothing but channels, the parameter buffer and a few
//! atomics the real-time side writes its lifecycle into. The handle turns
//! those into the [`BridgeInfo`] snapshot, so publishing never allocates on
//! the audio thread.

pub mod channel;
pub mod handle;
pub mod messages;
pub mod processor;

use arc_swap::ArcSwap;
use crossbeam::channel::bounded;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use crate::effect::EffectFamily;
use crate::module::DEFAULT_QUANTUM;

pub use channel::{DeliveryMode, ParameterChannel, ParameterUpdate, SharedParameterBuffer};
pub use handle::BridgeHandle;
pub use messages::{ControlMessage, Retired, StatusMessage};
pub use processor::BridgeProcessor;

const CONTROL_QUEUE_CAPACITY: usize = 64;
const STATUS_QUEUE_CAPACITY: usize = 16;
const RETIRED_QUEUE_CAPACITY: usize = 16;

/// Lifecycle of the real-time side. A quantum runs entirely inside `Ready`.
#[derive(Copy, Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum BridgeState {
    Uninitialized,
    Initializing,
    Ready,
    /// Initialization failed; the engine is unavailable until the next init.
    Failed,
}

impl BridgeState {
    const fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Initializing,
            2 => Self::Ready,
            3 => Self::Failed,
            _ => Self::Uninitialized,
        }
    }
}

impl std::fmt::Display for BridgeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Uninitialized => "uninitialized",
            Self::Initializing => "initializing",
            Self::Ready => "ready",
            Self::Failed => "engine unavailable",
        };
        f.write_str(name)
    }
}

/// Snapshot the real-time side publishes whenever its lifecycle changes.
#[derive(Debug, Clone, PartialEq)]
pub struct BridgeInfo {
    pub state: BridgeState,
    pub sample_rate: f32,
    pub quantum: usize,
    pub family: Option<EffectFamily>,
    pub bypassed: bool,
}

/// Lifecycle fields written by the real-time side with plain stores.
#[derive(Debug, Default)]
pub(crate) struct LiveState {
    state: AtomicU8,
    /// 0 for no module, otherwise one past the family's position in
    /// [`EffectFamily::ALL`].
    family: AtomicU8,
    bypassed: AtomicBool,
}

impl LiveState {
    pub(crate) fn set_state(&self, state: BridgeState) {
        self.state.store(state as u8, Ordering::Release);
    }

    pub(crate) fn set_family(&self, family: Option<EffectFamily>) {
        let code = family
            .and_then(|f| EffectFamily::ALL.iter().position(|&g| g == f))
            .map_or(0, |i| i as u8 + 1);
        self.family.store(code, Ordering::Release);
    }

    pub(crate) fn set_bypassed(&self, bypassed: bool) {
        self.bypassed.store(bypassed, Ordering::Release);
    }

    pub(crate) fn snapshot(&self, config: &BridgeConfig) -> BridgeInfo {
        let family = match self.family.load(Ordering::Acquire) {
            0 => None,
            code => EffectFamily::ALL.get(usize::from(code) - 1).copied(),
        };
        BridgeInfo {
            state: BridgeState::from_u8(self.state.load(Ordering::Acquire)),
            sample_rate: config.sample_rate,
            quantum: config.quantum,
            family,
            bypassed: self.bypassed.load(Ordering::Acquire),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BridgeConfig {
    pub sample_rate: f32,
    pub quantum: usize,
    pub delivery: DeliveryMode,
    pub parameter_queue_capacity: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48_000.0,
            quantum: DEFAULT_QUANTUM,
            delivery: DeliveryMode::Queued,
            parameter_queue_capacity: 1024,
        }
    }
}

/// Create a connected control handle and real-time processor.
pub fn bridge(config: BridgeConfig) -> (BridgeHandle, BridgeProcessor) {
    let (control_tx, control_rx) = bounded(CONTROL_QUEUE_CAPACITY);
    let (status_tx, status_rx) = bounded(STATUS_QUEUE_CAPACITY);
    let (retired_tx, retired_rx) = bounded(RETIRED_QUEUE_CAPACITY);

    let live = Arc::new(LiveState::default());
    let info = ArcSwap::from_pointee(live.snapshot(&config));

    let processor = BridgeProcessor::new(
        config,
        control_rx,
        status_tx,
        retired_tx,
        Arc::clone(&live),
    );
    let handle = BridgeHandle::new(config, control_tx, status_rx, retired_rx, live, info);

    (handle, processor)
}
