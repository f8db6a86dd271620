//! Ready/valid burst handshake.
//!
//! The FIFO firmware presents one word per cycle on `DataOut` while `Ready` is high, and
//! consumes it on any edge where the host drives `Control::ACK`. The host loop:
//! 1. **Samples** `Ready` and `DataOut` before the edge; the edge updates both.
//! 2. **Steps** one clock cycle with the control pattern chosen on the previous iteration.
//! 3. **Acts** on the pre-edge samples and chooses the control pattern for the next edge.
//!
//! `ACK` is only driven in `Active` with room left in the buffer, so a word is popped by the
//! firmware exactly when the host stores it. A word is stored only on an edge where ready was
//! sampled high: `DataOut` keeps showing the next unpopped word while ready is low, and
//! storing it then would duplicate it once ready returns.

use tracing::trace;

use crate::bus::{BusHandle, Control, Signal};
use crate::common::{UsbCommError, WaitTarget};

use super::timeout::{Deadline, step};

/// Cursor of the burst handshake.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HandshakeState {
    /// Read request asserted, ready not yet seen.
    WaitReady,
    /// Words flowing; one stored per edge with ready high.
    Active,
    /// Request dropped; counts quiet cycles (1-based).
    Drain(u8),
    /// Burst over; either finished or back to `WaitReady` for the rest.
    Done,
}

/// Counts one more cycle without ready.
///
/// The count saturates, so a budget of `u32::MAX` never expires.
///
/// # Errors
///
/// `HandshakeTimeout` once the count exceeds `budget`.
pub(crate) const fn count_wait(waited: u32, budget: u32) -> Result<u32, UsbCommError> {
    let waited = waited.saturating_add(1);
    if waited > budget {
        Err(UsbCommError::HandshakeTimeout { cycles: waited })
    } else {
        Ok(waited)
    }
}

/// Handshake parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Handshake {
    cycle_budget: u32,
    drain_cycles: u8,
}

impl Handshake {
    /// Creates a handshake that gives up after `cycle_budget` consecutive cycles without
    /// ready and ends a burst after `drain_cycles` quiet cycles.
    pub const fn new(cycle_budget: u32, drain_cycles: u8) -> Self {
        Self {
            cycle_budget,
            drain_cycles,
        }
    }

    /// Returns the cycle budget.
    pub const fn cycle_budget(&self) -> u32 {
        self.cycle_budget
    }

    /// Replaces the cycle budget.
    pub const fn set_cycle_budget(&mut self, cycles: u32) {
        self.cycle_budget = cycles;
    }

    /// Pulls `out.len()` words from the bus.
    ///
    /// Words are written into `out` as they arrive, so on failure `out` holds the prefix
    /// received so far.
    ///
    /// # Errors
    ///
    /// `HandshakeTimeout` once ready stays low for more than the cycle budget, or `Timeout`
    /// naming `waiting_for` when the deadline is reached at any edge.
    pub fn run(
        &self,
        bus: &mut dyn BusHandle,
        out: &mut [u32],
        deadline: Deadline,
        waiting_for: WaitTarget,
    ) -> Result<(), UsbCommError> {
        if out.is_empty() {
            return Ok(());
        }

        let len = out.len();
        let mut state = HandshakeState::WaitReady;
        let mut waited = 0u32;
        let mut read = 0usize;
        let mut edges = 0u64;

        bus.write(Signal::Control, Control::REQUEST);

        loop {
            let ready = bus.is_high(Signal::Ready);
            let data = bus.read(Signal::DataOut);

            step(bus, deadline, waiting_for)?;
            edges += 1;

            let (next, control) = match state {
                HandshakeState::WaitReady => {
                    if ready {
                        waited = 0;
                        (HandshakeState::Active, Control::ACTIVE)
                    } else {
                        waited = match count_wait(waited, self.cycle_budget) {
                            Ok(waited) => waited,
                            Err(err) => {
                                bus.write(Signal::Control, Control::IDLE);
                                return Err(err);
                            }
                        };
                        (HandshakeState::WaitReady, Control::REQUEST)
                    }
                }
                HandshakeState::Active => {
                    if ready {
                        out[read] = data;
                        read += 1;
                    }
                    if !ready || read >= len {
                        (HandshakeState::Drain(1), Control::DRAIN)
                    } else {
                        (HandshakeState::Active, Control::ACTIVE)
                    }
                }
                HandshakeState::Drain(n) => {
                    if ready && read < len {
                        waited = 0;
                        (HandshakeState::Active, Control::ACTIVE)
                    } else if n >= self.drain_cycles {
                        (HandshakeState::Done, Control::IDLE)
                    } else {
                        (HandshakeState::Drain(n + 1), Control::DRAIN)
                    }
                }
                HandshakeState::Done => {
                    if read >= len {
                        trace!(words = read, edges, "burst complete");
                        return Ok(());
                    }
                    (HandshakeState::WaitReady, Control::REQUEST)
                }
            };

            state = next;
            bus.write(Signal::Control, control);
        }
    }
}
