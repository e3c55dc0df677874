//! Parameter delivery from the control context into the real-time context.
//!
//! Two interchangeable channels implement [`ParameterChannel`]; the bridge
//! picks one at init and drains it at the start of every quantum, so a value
//! written on the control side is applied before the next quantum's first
//! sample.

use anyhow::Result;
use crossbeam::channel::{Receiver, Sender, TrySendError, bounded};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::params::Descriptor;

#[derive(Copy, Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMode {
    /// Ordered message queue drained each quantum.
    #[default]
    Queued,
    /// Shared buffer of `f32` slots, one atomic word per parameter.
    Shared,
}

impl std::fmt::Display for DeliveryMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Queued => write!(f, "queued"),
            Self::Shared => write!(f, "shared"),
        }
    }
}

/// One `setParameter` message, with the id already resolved to a slot index.
/// `seq` counts updates sent on this channel, starting at 1.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ParameterUpdate {
    pub index: usize,
    pub value: f32,
    pub seq: u64,
}

pub trait ParameterChannel: Send {
    /// Apply every pending update, in the order it was produced.
    fn drain(&mut self, apply: &mut dyn FnMut(usize, f32)) {
        self.drain_through(u64::MAX, apply);
    }

    /// Apply pending updates up to and including sequence number `mark`.
    /// Later updates stay pending.
    fn drain_through(&mut self, mark: u64, apply: &mut dyn FnMut(usize, f32));

    /// Make the next drain re-deliver the current value of every parameter
    /// this channel knows about.
    fn resync(&mut self);

    fn mode(&self) -> DeliveryMode;
}

pub struct QueuedChannel {
    rx: Receiver<ParameterUpdate>,
    /// Received but past the last mark.
    held: Option<ParameterUpdate>,
}

impl QueuedChannel {
    pub const fn new(rx: Receiver<ParameterUpdate>) -> Self {
        Self { rx, held: None }
    }
}

impl ParameterChannel for QueuedChannel {
    fn drain_through(&mut self, mark: u64, apply: &mut dyn FnMut(usize, f32)) {
        while let Some(update) = self.held.take().or_else(|| self.rx.try_recv().ok()) {
            if update.seq > mark {
                self.held = Some(update);
                break;
            }
            apply(update.index, update.value);
        }
    }

    // Queued updates are consumed on delivery, there is nothing to replay.
    fn resync(&mut self) {}

    fn mode(&self) -> DeliveryMode {
        DeliveryMode::Queued
    }
}

/// Fixed array of parameter slots readable and writable from any thread.
/// Each slot is one atomic word holding the bits of an `f32`, so a reader
/// never observes a torn value.
#[derive(Debug)]
pub struct SharedParameterBuffer {
    slots: Box<[AtomicU32]>,
}

impl SharedParameterBuffer {
    pub fn new(initial: &[f32]) -> Self {
        Self {
            slots: initial.iter().map(|v| AtomicU32::new(v.to_bits())).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    #[inline]
    pub fn store(&self, slot: usize, value: f32) -> bool {
        match self.slots.get(slot) {
            Some(word) => {
                word.store(value.to_bits(), Ordering::Release);
                true
            }
            None => false,
        }
    }

    #[inline]
    pub fn load(&self, slot: usize) -> Option<f32> {
        self.slots
            .get(slot)
            .map(|word| f32::from_bits(word.load(Ordering::Acquire)))
    }

    #[inline]
    fn load_bits(&self, slot: usize) -> u32 {
        self.slots[slot].load(Ordering::Acquire)
    }
}

/// Reads the shared buffer each quantum and forwards slots whose bits moved.
pub struct SharedChannel {
    buffer: Arc<SharedParameterBuffer>,
    /// Parameter index for each buffer slot.
    order: Box<[usize]>,
    last_seen: Box<[u32]>,
    primed: bool,
}

impl SharedChannel {
    /// `order[slot]` names the parameter index a buffer slot feeds.
    pub fn new(buffer: Arc<SharedParameterBuffer>, order: Vec<usize>) -> Result<Self> {
        if order.len() != buffer.len() {
            anyhow::bail!(
                "parameter order lists {} slots but the shared buffer has {}",
                order.len(),
                buffer.len()
            );
        }
        Ok(Self {
            last_seen: vec![0; order.len()].into_boxed_slice(),
            order: order.into_boxed_slice(),
            buffer,
            primed: false,
        })
    }
}

impl ParameterChannel for SharedChannel {
    // Slots hold levels, not events: there is nothing to hold back.
    fn drain_through(&mut self, _mark: u64, apply: &mut dyn FnMut(usize, f32)) {
        for (slot, (&index, seen)) in self.order.iter().zip(self.last_seen.iter_mut()).enumerate()
        {
            let bits = self.buffer.load_bits(slot);
            if !self.primed || bits != *seen {
                *seen = bits;
                apply(index, f32::from_bits(bits));
            }
        }
        self.primed = true;
    }

    fn resync(&mut self) {
        self.primed = false;
    }

    fn mode(&self) -> DeliveryMode {
        DeliveryMode::Shared
    }
}

/// Control-side writer matching whichever channel the bridge was given.
pub enum ParameterSender {
    Queued {
        tx: Sender<ParameterUpdate>,
        sent: u64,
    },
    Shared {
        buffer: Arc<SharedParameterBuffer>,
        /// Buffer slot for each parameter index, if it has one.
        slots: Vec<Option<usize>>,
    },
}

impl ParameterSender {
    pub fn send(&mut self, index: usize, value: f32) -> Result<()> {
        match self {
            Self::Queued { tx, sent } => match tx.try_send(ParameterUpdate {
                index,
                value,
                seq: *sent + 1,
            }) {
                Ok(()) => {
                    *sent += 1;
                    Ok(())
                }
                Err(TrySendError::Full(_)) => {
                    anyhow::bail!("parameter queue is full, update for slot {index} dropped")
                }
                Err(TrySendError::Disconnected(_)) => {
                    anyhow::bail!("real-time side of the bridge has gone away")
                }
            },
            Self::Shared { buffer, slots } => {
                match slots.get(index).copied().flatten() {
                    Some(slot) if buffer.store(slot, value) => Ok(()),
                    _ => anyhow::bail!("parameter {index} has no slot in the shared buffer"),
                }
            }
        }
    }

    pub const fn mode(&self) -> DeliveryMode {
        match self {
            Self::Queued { .. } => DeliveryMode::Queued,
            Self::Shared { .. } => DeliveryMode::Shared,
        }
    }

    /// Sequence number of the last update sent, for `drain_through`.
    pub const fn mark(&self) -> u64 {
        match self {
            Self::Queued { sent, .. } => *sent,
            Self::Shared { .. } => u64::MAX,
        }
    }

    /// Whether the channel re-delivers parameter `index` after a resync.
    pub fn replays(&self, index: usize) -> bool {
        match self {
            Self::Queued { .. } => false,
            Self::Shared { slots, .. } => slots.get(index).copied().flatten().is_some(),
        }
    }
}

/// Build a queued channel pair with room for `capacity` pending updates.
pub fn queued(capacity: usize) -> (ParameterSender, Box<dyn ParameterChannel>) {
    let (tx, rx) = bounded(capacity.max(1));
    (
        ParameterSender::Queued { tx, sent: 0 },
        Box::new(QueuedChannel::new(rx)),
    )
}

/// Lay out a shared buffer for `order`, a list of parameter ids in slot
/// order. Each slot is seeded from `current`, indexed by parameter, so the
/// first read of the new buffer re-applies the values already in effect.
/// Returns the buffer and the parameter index fed by each slot.
pub fn shared_buffer(
    descriptor: &Descriptor,
    order: &[String],
    current: &[f32],
) -> Result<(Arc<SharedParameterBuffer>, Vec<usize>)> {
    let mut indices = Vec::with_capacity(order.len());
    let mut initial = Vec::with_capacity(order.len());
    for id in order {
        let index = descriptor
            .index_of(id)
            .ok_or_else(|| anyhow::anyhow!("parameter '{id}' is not in the descriptor"))?;
        if indices.contains(&index) {
            anyhow::bail!("parameter '{id}' appears twice in the buffer order");
        }
        indices.push(index);
        initial.push(
            current
                .get(index)
                .copied()
                .unwrap_or(descriptor.params[index].default),
        );
    }

    Ok((Arc::new(SharedParameterBuffer::new(&initial)), indices))
}

impl ParameterSender {
    /// Writer for a shared buffer whose slot `i` feeds parameter `indices[i]`.
    pub fn for_buffer(
        buffer: Arc<SharedParameterBuffer>,
        indices: &[usize],
        param_count: usize,
    ) -> Self {
        let mut slots = vec![None; param_count];
        for (slot, &index) in indices.iter().enumerate() {
            if let Some(entry) = slots.get_mut(index) {
                *entry = Some(slot);
            }
        }
        Self::Shared { buffer, slots }
    }
}

/// Build a shared-buffer channel pair laid out in `order`, seeded from
/// `current`. The channel is boxed here so the real-time side only has to
/// move it into place.
pub fn shared(
    descriptor: &Descriptor,
    order: &[String],
    current: &[f32],
) -> Result<(ParameterSender, Box<dyn ParameterChannel>)> {
    let (buffer, indices) = shared_buffer(descriptor, order, current)?;
    let sender = ParameterSender::for_buffer(Arc::clone(&buffer), &indices, descriptor.params.len());
    let channel = SharedChannel::new(buffer, indices)?;
    Ok((sender, Box::new(channel)))
}
