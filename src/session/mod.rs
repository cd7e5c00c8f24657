// Public API - what other modules can use
pub use token::TokenConfig;
pub use types::AuthClaims;
pub use verifier::{AuthVerifier, JwtAuthVerifier};

// Internal modules
mod token;
mod types;
mod verifier;
