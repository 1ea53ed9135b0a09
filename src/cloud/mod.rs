//! Cloud dashboard subsystem.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │                    Cloud Stack                         │
//! │                                                        │
//! │  ┌───────────┐   ┌────────────────┐   ┌────────────┐  │
//! │  │ CloudPort │◀──│ TelemetryReporter│◀──│ AppService │ │
//! │  │ (trait)   │──▶│ (cadence, queue) │──▶│ (commands) │ │
//! │  └───────────┘   └────────────────┘   └────────────┘  │
//! └────────────────────────────────────────────────────────┘
//! ```
//!
//! The dashboard protocol itself is out of scope; [`CloudPort`] is the
//! seam, with [`LogCloud`] standing in as the default transport (logs
//! outbound values, never produces inbound writes).

pub mod channels;
pub mod reporter;

use crate::error::CommsError;
use channels::Channel;

/// A value published to, or received from, a dashboard channel.
#[derive(Debug, Clone, PartialEq)]
pub enum CloudValue {
    Int(i64),
    Float(f32),
    Str(heapless::String<32>),
}

impl CloudValue {
    pub fn str_from(s: &str) -> Self {
        let mut out = heapless::String::new();
        // Truncate rather than fail: channel strings are display-only.
        // Push per char so the cut always lands on a UTF-8 boundary.
        for c in s.chars() {
            if out.push(c).is_err() {
                break;
            }
        }
        Self::Str(out)
    }

    /// Numeric view of the value, for config-channel writes.
    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Self::Int(v) => Some(*v as f32),
            Self::Float(v) => Some(*v),
            Self::Str(_) => None,
        }
    }
}

/// An inbound write from the dashboard (button press, config change).
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelWrite {
    pub channel: Channel,
    pub value: CloudValue,
}

/// Cloud transport boundary.
///
/// Implementations are allowed to fail transiently — the reporter logs
/// and retries on the next cadence; pump control never depends on this.
pub trait CloudPort {
    /// Publish one value to a channel.
    fn publish(&mut self, channel: Channel, value: &CloudValue) -> Result<(), CommsError>;

    /// Poll for one inbound channel write, if any.
    fn poll(&mut self) -> Option<ChannelWrite>;

    /// Whether the transport currently has a live session.
    fn is_connected(&self) -> bool;
}

/// Default transport: logs every publish, never yields inbound writes.
pub struct LogCloud;

impl CloudPort for LogCloud {
    fn publish(&mut self, channel: Channel, value: &CloudValue) -> Result<(), CommsError> {
        log::debug!("cloud: V{} <- {:?}", channel, value);
        Ok(())
    }

    fn poll(&mut self) -> Option<ChannelWrite> {
        None
    }

    fn is_connected(&self) -> bool {
        true
    }
}

/// In-memory transport for host tests: records publishes, replays an
/// injected inbound queue.
#[cfg(not(target_os = "espidf"))]
pub struct SimCloud {
    pub published: Vec<(Channel, CloudValue)>,
    pub inbound: std::collections::VecDeque<ChannelWrite>,
    pub connected: bool,
    /// When set, every publish fails (exercises the retry path).
    pub fail_publishes: bool,
}

#[cfg(not(target_os = "espidf"))]
impl SimCloud {
    pub fn new() -> Self {
        Self {
            published: Vec::new(),
            inbound: std::collections::VecDeque::new(),
            connected: true,
            fail_publishes: false,
        }
    }

    /// Last value published to `channel`, if any.
    pub fn last_on(&self, channel: Channel) -> Option<&CloudValue> {
        self.published
            .iter()
            .rev()
            .find(|(ch, _)| *ch == channel)
            .map(|(_, v)| v)
    }
}

#[cfg(not(target_os = "espidf"))]
impl Default for SimCloud {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(not(target_os = "espidf"))]
impl CloudPort for SimCloud {
    fn publish(&mut self, channel: Channel, value: &CloudValue) -> Result<(), CommsError> {
        if !self.connected {
            return Err(CommsError::TransportUnavailable);
        }
        if self.fail_publishes {
            return Err(CommsError::PublishFailed);
        }
        self.published.push((channel, value.clone()));
        Ok(())
    }

    fn poll(&mut self) -> Option<ChannelWrite> {
        self.inbound.pop_front()
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}
