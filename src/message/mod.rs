// Public API
pub use models::{PersistedMessage, RelayedMessage};
pub use relay::MessageRelay;
pub use store::{InMemoryMessageStore, MessageStore, PostgresMessageStore};

// Internal modules
mod models;
mod relay;
mod store;
