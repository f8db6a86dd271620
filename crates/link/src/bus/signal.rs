//! Signal names and control encodings.
//!
//! Both transport variants share one set of named lines. The direct-register variant
//! uses the enable, busy, status, and write-mode lines; the burst-FIFO variant uses the
//! ready, control, and host-state lines. Address and data lines are common.

use std::fmt;

/// A named line on the simulated device link.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Signal {
    /// Active-low reset.
    ResetN,
    /// Terminal (endpoint) selector.
    TerminalAddr,
    /// Register address.
    RegAddr,
    /// Read enable pulse (direct register).
    ReadEnable,
    /// Write enable pulse (direct register and FIFO control-word writes).
    WriteEnable,
    /// Write-mode latch held for the whole of a direct-register write.
    WriteMode,
    /// Device busy (direct register, device driven).
    Busy,
    /// Device status after a register access (direct register, device driven).
    Status,
    /// FIFO ready/valid (device driven).
    Ready,
    /// FIFO control lines, see [`Control`].
    Control,
    /// Host-side protocol state presented to the FIFO firmware, see [`HostState`].
    HostState,
    /// Data from host to device.
    DataIn,
    /// Data from device to host (device driven).
    DataOut,
}

impl Signal {
    /// Every signal, in declaration order.
    pub const ALL: [Self; 13] = [
        Self::ResetN,
        Self::TerminalAddr,
        Self::RegAddr,
        Self::ReadEnable,
        Self::WriteEnable,
        Self::WriteMode,
        Self::Busy,
        Self::Status,
        Self::Ready,
        Self::Control,
        Self::HostState,
        Self::DataIn,
        Self::DataOut,
    ];

    /// Returns a dense index suitable for per-signal tables.
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Returns the conventional line name used in traces.
    pub const fn name(self) -> &'static str {
        match self {
            Self::ResetN => "resetb",
            Self::TerminalAddr => "term_addr",
            Self::RegAddr => "reg_addr",
            Self::ReadEnable => "re",
            Self::WriteEnable => "we",
            Self::WriteMode => "write_mode",
            Self::Busy => "busy",
            Self::Status => "status",
            Self::Ready => "rdy",
            Self::Control => "ctl",
            Self::HostState => "hi_state",
            Self::DataIn => "datain",
            Self::DataOut => "dataout",
        }
    }

    /// Returns `true` for lines driven by the device rather than the host.
    pub const fn is_device_driven(self) -> bool {
        matches!(
            self,
            Self::Busy | Self::Status | Self::Ready | Self::DataOut
        )
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Bit encodings for the FIFO control lines.
///
/// The host drives three bits: acknowledge, read/write strobe, and output enable.
#[derive(Debug)]
pub struct Control;

impl Control {
    /// Acknowledge: the host consumes the word on `DataOut` at this edge.
    pub const ACK: u32 = 0b001;
    /// Read/write strobe.
    pub const RDWR: u32 = 0b010;
    /// Output enable: the device may drive `DataOut`.
    pub const OE: u32 = 0b100;

    /// Read request held while waiting for ready.
    pub const REQUEST: u32 = Self::RDWR | Self::OE;
    /// Read request plus acknowledge while a burst is flowing.
    pub const ACTIVE: u32 = Self::RDWR | Self::OE | Self::ACK;
    /// Output enable only, after the read request drops.
    pub const DRAIN: u32 = Self::OE;
    /// All control lines released.
    pub const IDLE: u32 = 0;
    /// Control-word (header or transfer-count) write.
    pub const WRITE: u32 = Self::RDWR;
}

/// Host protocol state presented to the FIFO firmware on [`Signal::HostState`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[repr(u32)]
pub enum HostState {
    /// No transaction in flight.
    #[default]
    Idle = 0,
    /// Device streams payload words to the host.
    ReadData = 4,
    /// Host writes the next window's word count.
    TransferCount = 7,
    /// Host streams payload words to the device.
    WriteData = 8,
    /// Host writes the four command-header words.
    Command = 9,
    /// Device streams the two acknowledgment words.
    Ack = 10,
}

impl HostState {
    /// Decodes a raw line value; unknown values map to `None`.
    pub const fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::Idle),
            4 => Some(Self::ReadData),
            7 => Some(Self::TransferCount),
            8 => Some(Self::WriteData),
            9 => Some(Self::Command),
            10 => Some(Self::Ack),
            _ => None,
        }
    }

    /// Returns the raw line value.
    pub const fn as_u32(self) -> u32 {
        self as u32
    }
}
