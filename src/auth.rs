//! Credential model: redacted token secrets, the access/refresh pair, and store keys.

pub mod credentials;
pub mod secret;

pub use credentials::*;
pub use secret::*;
