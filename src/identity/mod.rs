//! Operator authentication for the admin surface: a single operator account checked against
//! an Argon2 hash, and opaque server-side session tokens.

mod credentials;
mod session;

pub use credentials::{hash_password, verify_password, OperatorCredentials};
pub use session::{Session, SessionManager, SessionToken};
