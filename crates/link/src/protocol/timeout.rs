//! Timeout clock.
//!
//! Caller timeouts are expressed in abstract units and converted once per transaction into
//! an absolute deadline in the bus handle's tick domain. Every wait in the engine goes
//! through [`step`], which advances exactly one clock cycle and then checks the deadline,
//! so a failing wait returns no earlier than the deadline and no later than one cycle past it.

use std::fmt;

use crate::bus::BusHandle;
use crate::common::{UsbCommError, WaitTarget};

/// Absolute simulated time, in ticks, at which a transaction fails.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Deadline(pub u64);

impl Deadline {
    /// A deadline that is never reached.
    pub const NEVER: Self = Self(u64::MAX);

    /// Returns the deadline in ticks.
    #[inline]
    pub const fn ticks(self) -> u64 {
        self.0
    }

    /// Returns `true` if this is the unbounded deadline.
    #[inline]
    pub const fn is_never(self) -> bool {
        self.0 == u64::MAX
    }
}

impl fmt::Display for Deadline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_never() {
            f.write_str("never")
        } else {
            write!(f, "t={}", self.0)
        }
    }
}

/// Converts a caller timeout into an absolute deadline.
///
/// A timeout of zero means no deadline. Otherwise the result is
/// `now + timeout_units * time_scale`, saturating at [`Deadline::NEVER`].
#[inline]
pub const fn compute_deadline(timeout_units: u32, now: u64, time_scale: u64) -> Deadline {
    if timeout_units == 0 {
        return Deadline::NEVER;
    }
    Deadline(now.saturating_add((timeout_units as u64).saturating_mul(time_scale)))
}

/// Returns `true` once `now` has reached `deadline`.
#[inline]
pub const fn is_expired(now: u64, deadline: Deadline) -> bool {
    now >= deadline.0
}

/// Advances the bus one clock cycle, then fails if the deadline has been reached.
///
/// # Errors
///
/// Returns `UsbCommError::Timeout` naming `waiting_for` when the deadline expired.
pub fn step(
    bus: &mut dyn BusHandle,
    deadline: Deadline,
    waiting_for: WaitTarget,
) -> Result<(), UsbCommError> {
    bus.advance(1);
    if is_expired(bus.now(), deadline) {
        return Err(UsbCommError::Timeout {
            waiting_for,
            deadline: deadline.ticks(),
        });
    }
    Ok(())
}

/// Advances the bus `cycles` clock cycles, checking the deadline after each one.
///
/// # Errors
///
/// Returns `UsbCommError::Timeout` as soon as the deadline is reached.
pub fn idle(
    bus: &mut dyn BusHandle,
    cycles: u32,
    deadline: Deadline,
    waiting_for: WaitTarget,
) -> Result<(), UsbCommError> {
    for _ in 0..cycles {
        step(bus, deadline, waiting_for)?;
    }
    Ok(())
}
