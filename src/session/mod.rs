// Session domain: court assignments, match settlement, billing, history.

pub mod billing;
pub mod courts;
pub mod history;
pub mod settlement;
pub mod slot;
pub mod state;

/// Opaque player identifier (UUID string; the guest uses a reserved id).
pub type PlayerId = String;
