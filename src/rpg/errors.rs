use thiserror::Error;

/// Errors that can arise while operating on player state through the engine.
///
/// Every variant is returned to the caller, never raised across the module
/// boundary. A failed mutator leaves the persisted document untouched.
#[derive(Debug, Error)]
pub enum RpgError {
    /// Wrapper around sled's error type.
    #[error("store error: {0}")]
    Store(#[from] sled::Error),

    /// Wrapper around bincode serialization and deserialization errors.
    #[error("serialization error: {0}")]
    Encoding(#[from] bincode::Error),

    /// Wrapper around IO errors (directory creation, seed files, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Returned when fetching a record that is not present.
    #[error("record not found: {0}")]
    NotFound(String),

    /// Gold debit larger than the current balance.
    #[error("insufficient gold")]
    InsufficientGold,

    /// Item removal larger than the owned quantity.
    #[error("insufficient items: {0}")]
    InsufficientItems(String),

    /// Player level below a story-quest or content gate.
    #[error("insufficient level: requires {required}")]
    InsufficientLevel { required: u32 },

    /// A daily or weekly quest slot is already taken.
    #[error("quest slot occupied")]
    SlotOccupied,

    /// Item type does not match the equipment slot.
    #[error("item does not fit slot: {0}")]
    SlotMismatch(String),

    /// Combat start while a session is already active for this player.
    #[error("already in combat")]
    AlreadyInCombat,

    /// Combat action without an active session.
    #[error("not in combat")]
    NotInCombat,

    /// Action gated by a cooldown that has not elapsed.
    #[error("on cooldown: {remaining_seconds}s remaining")]
    OnCooldown { remaining_seconds: i64 },

    /// Post-mutation invariant check failed; the transaction was discarded.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    /// Mutator exceeded its wall-clock budget; the transaction was discarded.
    #[error("mutator exceeded time budget")]
    Timeout,

    /// Unknown catalog entity (item, quest template, encounter, …).
    #[error("unknown catalog entry: {0}")]
    UnknownEntry(String),
}
