// Public API
pub use notifier::PresenceNotifier;

// Internal modules
mod notifier;
