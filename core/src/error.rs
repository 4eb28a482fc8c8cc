//! Bridge error taxonomy
//!
//! Host functions return `anyhow::Result`, so every variant here traps the
//! calling module and surfaces from the outermost export call. Callers that
//! need to tell the kinds apart can `downcast_ref::<BridgeError>()`.

/// Errors raised while marshalling, binding imports or relaying moves
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BridgeError {
    /// A module imports a name no registered provider defines
    #[error("unresolved import '{module}::{name}'")]
    UnresolvedImport { module: String, name: String },

    /// A read or write would cross the end of a module's memory
    #[error("out of bounds access at {addr:#x} (+{len} bytes) in memory of {size} bytes")]
    OutOfBounds { addr: u32, len: usize, size: usize },

    /// A draw or play call referenced a handle that was never interned
    #[error("unknown resource handle {0}")]
    UnknownHandle(u32),

    /// A player's allocator returned zero or an address that does not fit its memory
    #[error("player '{player}' failed to allocate {size} bytes (returned {addr:#x})")]
    AllocationFailure { player: String, size: u32, addr: u32 },

    /// A player's export trapped during a relay call
    #[error("player '{player}' faulted in {export}(): {message}")]
    PlayerFault {
        player: String,
        export: String,
        message: String,
    },

    /// A required export is missing or has the wrong signature
    #[error("module '{module}' does not export '{export}' with the expected signature")]
    MissingExport { module: String, export: String },

    /// The calling module exports no linear memory
    #[error("module does not export a linear memory")]
    NoMemory,

    /// A relay import names a player slot outside the roster
    #[error("no player registered in slot {0}")]
    UnknownPlayer(usize),

    /// The coordinator passed a negative move count
    #[error("negative move count {0}")]
    NegativeCount(i32),

    /// Record size times count does not fit in 32 bits
    #[error("move set of {count} records of {record_size} bytes overflows 32-bit addressing")]
    SizeOverflow { record_size: u32, count: u32 },
}
