use anyhow::Result;
use crossbeam::channel::{Receiver, Sender};
use log::{debug, error};
use std::sync::Arc;

use crate::bridge::channel::ParameterChannel;
use crate::bridge::messages::{ControlMessage, Retired, StatusMessage};
use crate::bridge::{BridgeConfig, BridgeState, LiveState};
use crate::effect::Lifecycle;
use crate::module::ModuleInstance;
use crate::params::Descriptor;

/// Real-time half of the bridge. Owns the module instance for the whole
/// session and is the only thing that ever touches its state.
///
/// Control messages are handled at the start of a quantum. Once a module is
/// ready, a quantum drains the parameter channel, copies host input into the
/// module's linear memory, calls `process` and copies the output back. None
/// of that allocates, logs or locks; the only exception is `init`, which
/// builds a new module and is never part of the steady state.
pub struct BridgeProcessor {
    config: BridgeConfig,
    state: BridgeState,
    control_rx: Receiver<ControlMessage>,
    status_tx: Sender<StatusMessage>,
    retired_tx: Sender<Retired>,
    live: Arc<LiveState>,
    module: Option<Box<ModuleInstance>>,
    channel: Option<Box<dyn ParameterChannel>>,
    bypass: bool,
}

impl BridgeProcessor {
    pub(crate) fn new(
        config: BridgeConfig,
        control_rx: Receiver<ControlMessage>,
        status_tx: Sender<StatusMessage>,
        retired_tx: Sender<Retired>,
        live: Arc<LiveState>,
    ) -> Self {
        let processor = Self {
            config,
            state: BridgeState::Uninitialized,
            control_rx,
            status_tx,
            retired_tx,
            live,
            module: None,
            channel: None,
            bypass: false,
        };
        processor.send_status(StatusMessage::Ready);
        processor
    }

    pub const fn state(&self) -> BridgeState {
        self.state
    }

    pub const fn quantum(&self) -> usize {
        self.config.quantum
    }

    /// Value the module is running with, through its `get_` export.
    pub fn parameter(&self, index: usize) -> Option<f32> {
        let module = self.module.as_deref()?;
        (index < module.image().family.params().len()).then(|| module.get(index))
    }

    /// Pull one quantum. Inputs and outputs longer than the quantum are
    /// processed up to the quantum; any output past that is silenced.
    pub fn process(
        &mut self,
        in_left: &[f32],
        in_right: &[f32],
        out_left: &mut [f32],
        out_right: &mut [f32],
    ) {
        self.handle_messages();

        let n = in_left
            .len()
            .min(in_right.len())
            .min(out_left.len())
            .min(out_right.len())
            .min(self.config.quantum);

        out_left[n..].fill(0.0);
        out_right[n..].fill(0.0);

        let module = match self.module.as_deref_mut() {
            Some(module) if self.state == BridgeState::Ready => module,
            _ => {
                if self.bypass {
                    out_left[..n].copy_from_slice(&in_left[..n]);
                    out_right[..n].copy_from_slice(&in_right[..n]);
                } else {
                    out_left[..n].fill(0.0);
                    out_right[..n].fill(0.0);
                }
                return;
            }
        };

        if let Some(channel) = self.channel.as_deref_mut() {
            channel.drain(&mut |index, value| {
                module.set(index, value);
            });
        }

        if self.bypass {
            out_left[..n].copy_from_slice(&in_left[..n]);
            out_right[..n].copy_from_slice(&in_right[..n]);
        } else {
            let layout = module.layout();
            let memory = module.memory_mut();
            memory.write(layout.input_left, &in_left[..n]);
            memory.write(layout.input_right, &in_right[..n]);

            module.process(
                layout.input_left,
                layout.input_right,
                layout.output_left,
                layout.output_right,
                n as u32,
            );

            let memory = module.memory();
            if !memory.read(layout.output_left, &mut out_left[..n])
                || !memory.read(layout.output_right, &mut out_right[..n])
            {
                out_left[..n].fill(0.0);
                out_right[..n].fill(0.0);
            }
        }
    }

    pub fn handle_messages(&mut self) {
        while let Ok(message) = self.control_rx.try_recv() {
            match message {
                ControlMessage::Init {
                    module_bytes,
                    descriptor,
                    channel,
                } => {
                    // Builds a whole module, so this arm may allocate and log.
                    self.initialize(&module_bytes, &descriptor, channel);
                }
                ControlMessage::SetParameterBuffer { channel } => {
                    // Updates still queued on the old channel go first.
                    self.drain_parameters(u64::MAX);
                    if let Some(old) = self.channel.replace(channel) {
                        self.retire(Retired::Channel(old));
                    }
                }
                ControlMessage::Bypass { enabled } => {
                    self.bypass = enabled;
                    self.live.set_bypassed(enabled);
                }
                ControlMessage::Reset => {
                    if let Some(module) = self.module.as_deref_mut() {
                        module.reset();
                    }
                }
                ControlMessage::Destroy { through } => self.destroy_module(through),
            }
        }
    }

    fn drain_parameters(&mut self, mark: u64) {
        if let (Some(module), Some(channel)) =
            (self.module.as_deref_mut(), self.channel.as_deref_mut())
        {
            channel.drain_through(mark, &mut |index, value| {
                module.set(index, value);
            });
        }
    }

    fn set_state(&mut self, state: BridgeState) {
        self.state = state;
        self.live.set_state(state);
    }

    fn initialize(
        &mut self,
        module_bytes: &[u8],
        descriptor: &Descriptor,
        channel: Box<dyn ParameterChannel>,
    ) {
        self.set_state(BridgeState::Initializing);

        if let Some(old) = self.module.take() {
            self.retire(Retired::Module(old));
        }
        if let Some(old) = self.channel.take() {
            self.retire(Retired::Channel(old));
        }
        self.live.set_family(None);

        match self.instantiate(module_bytes, descriptor) {
            Ok(module) => {
                debug!("Module for {} ready", module.family());
                self.live.set_family(Some(module.family()));
                self.module = Some(module);
                self.channel = Some(channel);
                self.set_state(BridgeState::Ready);
                self.send_status(StatusMessage::Initialized {
                    sample_rate: self.config.sample_rate,
                    quantum: self.config.quantum,
                });
            }
            Err(e) => {
                error!("Module initialization failed: {e:#}");
                self.retire(Retired::Channel(channel));
                self.set_state(BridgeState::Failed);
                self.send_status(StatusMessage::Error {
                    message: format!("{e:#}"),
                });
            }
        }
    }

    fn instantiate(
        &self,
        module_bytes: &[u8],
        descriptor: &Descriptor,
    ) -> Result<Box<ModuleInstance>> {
        let mut module = Box::new(ModuleInstance::instantiate(module_bytes, descriptor)?);
        let quantum = module.layout().quantum;
        if quantum < self.config.quantum {
            anyhow::bail!(
                "module quantum {quantum} is smaller than the render quantum {}",
                self.config.quantum
            );
        }
        module.prepare(self.config.sample_rate)?;
        Ok(module)
    }

    /// Destroy the module and prepare it again, leaving a clean instance with
    /// default parameters. Updates sent before the destroy are applied first;
    /// afterwards the parameter channel replays its current values.
    fn destroy_module(&mut self, through: u64) {
        self.drain_parameters(through);
        let Some(module) = self.module.as_deref_mut() else {
            return;
        };

        module.destroy();
        // Same sample rate as the first prepare, so buffers keep their size.
        if module.prepare(self.config.sample_rate).is_err() {
            self.set_state(BridgeState::Failed);
            self.send_status(StatusMessage::DestroyFailed);
        }

        if let Some(channel) = self.channel.as_deref_mut() {
            channel.resync();
        }
    }

    /// A full retired queue means the control side stopped collecting; the
    /// object is then released here.
    fn retire(&self, item: Retired) {
        let _ = self.retired_tx.try_send(item);
    }

    /// Statuses are dropped when the control side is not reading them.
    fn send_status(&self, status: StatusMessage) {
        let _ = self.status_tx.try_send(status);
    }
}
