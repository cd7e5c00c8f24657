// Public API - what other modules can use
pub use directory::{InMemoryRoomDirectory, PostgresRoomDirectory, RoomDirectory};
pub use membership::{Departure, JoinOutcome, LeaveOutcome, MembershipTracker, RoomSnapshot};
pub use models::{MembershipEntry, RoomModel};

// Internal modules
pub mod directory;
pub mod membership;
pub mod models;
