// handlers/protected/auth/mod.rs - Session handlers for authenticated users

pub mod session;

pub use session::{me_get, password_put};
