use crate::bridge::channel::ParameterChannel;
use crate::module::ModuleInstance;
use crate::params::Descriptor;

/// Control context to real-time context. `setParameter` does not appear here:
/// it travels on the parameter channel so it can be applied in order at the
/// quantum boundary without touching this queue.
pub enum ControlMessage {
    Init {
        module_bytes: Vec<u8>,
        descriptor: Descriptor,
        channel: Box<dyn ParameterChannel>,
    },
    /// Replacement channel over a new shared buffer, built and seeded on the
    /// control side.
    SetParameterBuffer {
        channel: Box<dyn ParameterChannel>,
    },
    Bypass {
        enabled: bool,
    },
    Reset,
    /// Queued parameter updates up to `through` were sent before the destroy
    /// and are applied ahead of it.
    Destroy {
        through: u64,
    },
}

impl std::fmt::Debug for ControlMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Init {
                module_bytes,
                descriptor,
                channel,
            } => f
                .debug_struct("Init")
                .field("module_bytes", &module_bytes.len())
                .field("family", &descriptor.family)
                .field("channel", &channel.mode())
                .finish(),
            Self::SetParameterBuffer { channel } => f
                .debug_struct("SetParameterBuffer")
                .field("channel", &channel.mode())
                .finish(),
            Self::Bypass { enabled } => f.debug_struct("Bypass").field("enabled", enabled).finish(),
            Self::Reset => write!(f, "Reset"),
            Self::Destroy { through } => {
                f.debug_struct("Destroy").field("through", through).finish()
            }
        }
    }
}

/// Real-time context to control context.
#[derive(Debug, Clone, PartialEq)]
pub enum StatusMessage {
    Ready,
    Initialized { sample_rate: f32, quantum: usize },
    Error { message: String },
    /// The module could not be prepared again after `destroy`.
    DestroyFailed,
}

impl std::fmt::Display for StatusMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ready => write!(f, "ready"),
            Self::Initialized {
                sample_rate,
                quantum,
            } => write!(f, "initialized at {sample_rate} Hz, quantum {quantum}"),
            Self::Error { message } => write!(f, "error: {message}"),
            Self::DestroyFailed => write!(f, "error: module failed to prepare after destroy"),
        }
    }
}

/// Objects the real-time side has let go of, handed back so they are freed
/// on the control side.
pub enum Retired {
    Module(Box<ModuleInstance>),
    Channel(Box<dyn ParameterChannel>),
}
