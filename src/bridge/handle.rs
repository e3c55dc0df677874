use anyhow::{Context, Result};
use arc_swap::ArcSwap;
use crossbeam::channel::{Receiver, RecvTimeoutError, Sender, TrySendError};
use log::{debug, info};
use std::sync::Arc;
use std::time::Duration;

use crate::bridge::channel::{self, DeliveryMode, ParameterSender};
use crate::bridge::messages::{ControlMessage, Retired, StatusMessage};
use crate::bridge::{BridgeConfig, BridgeInfo, LiveState};
use crate::params::Descriptor;

/// Control half of the bridge.
pub struct BridgeHandle {
    config: BridgeConfig,
    control_tx: Sender<ControlMessage>,
    status_rx: Receiver<StatusMessage>,
    retired_rx: Receiver<Retired>,
    live: Arc<LiveState>,
    info: ArcSwap<BridgeInfo>,
    descriptor: Option<Descriptor>,
    params: Option<ParameterSender>,
    /// Last value sent for each parameter, clamped the way the module clamps.
    values: Vec<f32>,
}

impl BridgeHandle {
    pub(crate) fn new(
        config: BridgeConfig,
        control_tx: Sender<ControlMessage>,
        status_rx: Receiver<StatusMessage>,
        retired_rx: Receiver<Retired>,
        live: Arc<LiveState>,
        info: ArcSwap<BridgeInfo>,
    ) -> Self {
        Self {
            config,
            control_tx,
            status_rx,
            retired_rx,
            live,
            info,
            descriptor: None,
            params: None,
            values: Vec::new(),
        }
    }

    /// Latest lifecycle snapshot of the real-time side. The snapshot is only
    /// replaced when something moved since the last call.
    pub fn info(&self) -> Arc<BridgeInfo> {
        let current = self.live.snapshot(&self.config);
        if **self.info.load() != current {
            self.info.store(Arc::new(current));
        }
        self.info.load_full()
    }

    /// Values the control side has most recently sent, by parameter index.
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub const fn descriptor(&self) -> Option<&Descriptor> {
        self.descriptor.as_ref()
    }

    pub fn delivery(&self) -> DeliveryMode {
        self.params
            .as_ref()
            .map_or(self.config.delivery, ParameterSender::mode)
    }

    fn send(&self, message: ControlMessage) -> Result<()> {
        match self.control_tx.try_send(message) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(message)) => {
                anyhow::bail!("control queue is full, dropped {message:?}")
            }
            Err(TrySendError::Disconnected(_)) => {
                anyhow::bail!("real-time side of the bridge has gone away")
            }
        }
    }

    /// Send `init`. The parameter channel is built here, in the delivery mode
    /// from the bridge config, and travels with the message.
    pub fn init(&mut self, module_bytes: Vec<u8>, descriptor: Descriptor) -> Result<()> {
        let (sender, receiver) = match self.config.delivery {
            DeliveryMode::Queued => channel::queued(self.config.parameter_queue_capacity),
            DeliveryMode::Shared => {
                let order: Vec<String> = descriptor.ids().map(str::to_string).collect();
                channel::shared(&descriptor, &order, &descriptor.defaults())
                    .context("Failed to build shared parameter buffer")?
            }
        };

        info!(
            "Initializing {} module ({} bytes, {} parameter delivery)",
            descriptor.family,
            module_bytes.len(),
            sender.mode()
        );

        self.send(ControlMessage::Init {
            module_bytes,
            descriptor: descriptor.clone(),
            channel: receiver,
        })?;
        self.values = descriptor.defaults();
        self.descriptor = Some(descriptor);
        self.params = Some(sender);
        Ok(())
    }

    fn resolve(&self, id: &str) -> Result<usize> {
        let descriptor = self
            .descriptor
            .as_ref()
            .context("bridge has not been initialized")?;
        descriptor
            .index_of(id)
            .with_context(|| format!("unknown parameter '{id}' for {}", descriptor.family))
    }

    /// `setParameter{id, value}`. Visible to the real-time side at the next
    /// quantum boundary.
    pub fn set_parameter(&mut self, id: &str, value: f32) -> Result<()> {
        let index = self.resolve(id)?;
        let sender = self
            .params
            .as_mut()
            .context("bridge has not been initialized")?;
        sender.send(index, value)?;

        if let (Some(slot), Some(descriptor)) = (self.values.get_mut(index), &self.descriptor) {
            *slot = descriptor.params[index].clamp(value);
        }
        Ok(())
    }

    /// `setParameterBuffer{sharedBuffer, parameterIdOrder}`: switch delivery
    /// to a fresh shared buffer laid out in `order`. The buffer starts out
    /// holding the values already sent, so the switch changes no parameter.
    pub fn set_parameter_buffer(&mut self, order: &[String]) -> Result<()> {
        let descriptor = self
            .descriptor
            .as_ref()
            .context("bridge has not been initialized")?;
        let (sender, receiver) = channel::shared(descriptor, order, &self.values)?;

        self.send(ControlMessage::SetParameterBuffer { channel: receiver })?;
        debug!("Switching to a {} slot shared parameter buffer", order.len());
        self.params = Some(sender);
        Ok(())
    }

    pub fn bypass(&self, enabled: bool) -> Result<()> {
        self.send(ControlMessage::Bypass { enabled })?;
        debug!("Bridge bypass: {enabled}");
        Ok(())
    }

    pub fn reset(&self) -> Result<()> {
        self.send(ControlMessage::Reset)?;
        debug!("Bridge reset requested");
        Ok(())
    }

    /// `destroy{}`. The module comes back with its defaults; a shared buffer
    /// then replays its slots, a queue has nothing left to replay.
    pub fn destroy(&mut self) -> Result<()> {
        let through = self.params.as_ref().map_or(0, ParameterSender::mark);
        self.send(ControlMessage::Destroy { through })?;
        debug!("Bridge destroy requested");

        if let (Some(descriptor), Some(sender)) = (&self.descriptor, &self.params) {
            let rows = self.values.iter_mut().zip(&descriptor.params);
            for (index, (value, param)) in rows.enumerate() {
                if !sender.replays(index) {
                    *value = param.default;
                }
            }
        }
        Ok(())
    }

    pub fn try_status(&self) -> Option<StatusMessage> {
        self.status_rx.try_recv().ok()
    }

    /// Block until the real-time side reports something.
    pub fn wait_status(&self, timeout: Duration) -> Result<StatusMessage> {
        match self.status_rx.recv_timeout(timeout) {
            Ok(status) => Ok(status),
            Err(RecvTimeoutError::Timeout) => {
                anyhow::bail!("no status from the real-time side within {timeout:?}")
            }
            Err(RecvTimeoutError::Disconnected) => {
                anyhow::bail!("real-time side of the bridge has gone away")
            }
        }
    }

    /// Free whatever the real-time side has handed back. Returns the count.
    pub fn collect_retired(&self) -> usize {
        let mut count = 0;
        while let Ok(item) = self.retired_rx.try_recv() {
            match item {
                Retired::Module(module) => debug!("Releasing retired {} module", module.family()),
                Retired::Channel(channel) => {
                    debug!("Releasing retired {} parameter channel", channel.mode());
                }
            }
            count += 1;
        }
        count
    }
}
