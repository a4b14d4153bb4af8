// handlers/public/auth/mod.rs - Public authentication handlers

pub mod login; // POST /api/auth/login - exchange credentials for a JWT

pub use login::login_post;
