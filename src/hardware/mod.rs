//! Hardware sessions and transports.
//!
//! Two physical sessions exist on this bench, each exclusively owned for the
//! duration of a run:
//!
//! - the SMU, reached over a SCPI transport ([`scpi`], [`smu`]);
//! - the relay/shutter board, reached over a byte-oriented serial transport
//!   ([`relay`]) and driven through the validating [`switch`].
//!
//! Real transports are feature-gated (`instrument_visa`, `instrument_serial`);
//! the [`mock`] implementations are always compiled and back the test suite
//! and `--mock` runs.

pub mod mock;
pub mod relay;
pub mod scpi;
pub mod smu;
pub mod switch;

pub use relay::RelayTransport;
pub use scpi::ScpiTransport;
pub use smu::{Keithley2400, Sample, SmuSession};
pub use switch::{ChannelSelection, DeviceSwitch, IlluminationChange, RelayState};
