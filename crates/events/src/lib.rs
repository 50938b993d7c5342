//! Ledger state propagation: update messages and the fan-out bus.

pub mod bus;
pub mod in_memory_bus;
pub mod update;

pub use bus::{EventBus, Subscription};
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
pub use update::LedgerUpdate;
