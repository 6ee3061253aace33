//! Device and illumination switching.
//!
//! [`DeviceSwitch`] is the only component that talks to the relay board. It
//! validates requested channels and states before issuing a frame, and it
//! recovers invalid requests instead of failing: an unknown channel falls
//! back to the first configured channel, an unknown state falls back to off.
//! Each correction is logged as a warning and reported in the returned
//! outcome, so callers can escalate if they care. Transport failures remain
//! real errors.
//!
//! Every operation is followed by a fixed settle interval before it is
//! considered complete; relays and the shutter need time to actuate, and the
//! board's acknowledgement only confirms receipt, not completion.

use std::time::Duration;

use tokio::time::sleep;
use tracing::warn;

use crate::error::BenchResult;
use crate::hardware::relay::RelayTransport;

/// Reserved wire index driving the illumination shutter. Outside the device
/// channel range by a wide margin.
pub const LIGHT_WIRE_INDEX: u8 = 19;

/// Hardware settle interval after each relay operation.
pub const SETTLE_INTERVAL: Duration = Duration::from_secs(1);

/// State of one relay or the shutter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayState {
    /// Contact open / shutter closed.
    Off,
    /// Contact closed / shutter open.
    On,
}

impl RelayState {
    /// Decode a wire-level state byte; anything but 0 or 1 is invalid.
    pub fn from_wire(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(Self::Off),
            1 => Some(Self::On),
            _ => None,
        }
    }

    /// Wire-level encoding.
    pub fn wire(self) -> u8 {
        match self {
            Self::Off => 0,
            Self::On => 1,
        }
    }
}

/// Outcome of a channel selection, carrying what was actually applied.
#[derive(Debug, Clone, Copy)]
pub struct ChannelSelection {
    /// Channel the frame was issued for (one-based).
    pub channel: u8,
    /// State the frame was issued with.
    pub state: RelayState,
    /// True if the requested channel was invalid and the default was used.
    pub channel_corrected: bool,
    /// True if the requested state was invalid and off was used.
    pub state_corrected: bool,
}

/// Outcome of an illumination change.
#[derive(Debug, Clone, Copy)]
pub struct IlluminationChange {
    /// State the shutter frame was issued with.
    pub state: RelayState,
    /// True if the requested state was invalid and off was used.
    pub state_corrected: bool,
}

/// Validating front-end to the relay board.
///
/// Owns the relay transport exclusively; channel and illumination
/// operations never overlap in time.
pub struct DeviceSwitch {
    transport: Box<dyn RelayTransport>,
    channels: Vec<u8>,
    settle: Duration,
}

impl DeviceSwitch {
    /// Create a switch over `transport` accepting the given one-based
    /// channel set. The first channel in the set is the fallback target for
    /// invalid requests.
    pub fn new(transport: Box<dyn RelayTransport>, channels: Vec<u8>) -> Self {
        Self {
            transport,
            channels,
            settle: SETTLE_INTERVAL,
        }
    }

    /// Override the settle interval. Mock hardware settles instantly.
    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    /// Connect or disconnect a device channel.
    ///
    /// `state` is the raw wire encoding (0 = off, 1 = on). Invalid channels
    /// select the default channel instead; invalid states disconnect. Both
    /// corrections are reported in the outcome, never raised as errors.
    pub async fn select_channel(
        &mut self,
        channel: u8,
        state: u8,
    ) -> BenchResult<ChannelSelection> {
        let (channel, channel_corrected) = if self.channels.contains(&channel) {
            (channel, false)
        } else {
            let fallback = self.channels.first().copied().unwrap_or(1);
            warn!(
                requested = channel,
                fallback, "Not a valid device channel, selecting default"
            );
            (fallback, true)
        };

        let (state, state_corrected) = match RelayState::from_wire(state) {
            Some(state) => (state, false),
            None => {
                warn!(requested = state, "Not a valid relay state, setting to off");
                (RelayState::Off, true)
            }
        };

        // One-based channels map to zero-based wire indices.
        self.issue(channel - 1, state).await?;

        Ok(ChannelSelection {
            channel,
            state,
            channel_corrected,
            state_corrected,
        })
    }

    /// Open or close the illumination shutter.
    ///
    /// `state` is the raw wire encoding; invalid states close the shutter,
    /// reported in the outcome rather than raised.
    pub async fn set_illumination(&mut self, state: u8) -> BenchResult<IlluminationChange> {
        let (state, state_corrected) = match RelayState::from_wire(state) {
            Some(state) => (state, false),
            None => {
                warn!(requested = state, "Not a valid shutter state, setting to off");
                (RelayState::Off, true)
            }
        };

        self.issue(LIGHT_WIRE_INDEX, state).await?;

        Ok(IlluminationChange {
            state,
            state_corrected,
        })
    }

    /// Issue one frame, wait the settle interval, discard the acknowledgement.
    async fn issue(&mut self, wire_index: u8, state: RelayState) -> BenchResult<()> {
        let _ack = self.transport.send(wire_index, state.wire()).await?;
        sleep(self.settle).await;
        Ok(())
    }
}
