//! Signal-level bus interface.
//!
//! The protocol engine never touches a hardware model directly. It goes through:
//! 1. **`Signal`:** The named lines shared by both transport variants.
//! 2. **`BusHandle`:** Peek/poke of those lines, clock advance, and the simulated time source.
//! 3. **`BusLogger`:** A decorator that traces every line the engine drives.

/// Bus logging decorator.
pub mod logger;

/// Signal names and control-line encodings.
pub mod signal;

/// The bus handle trait.
pub mod traits;

pub use logger::BusLogger;
pub use signal::{Control, HostState, Signal};
pub use traits::BusHandle;
