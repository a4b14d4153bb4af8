// handlers/mod.rs - Handlers grouped by access tier
//
// public    - no authentication (service info, health, login)
// protected - JWT authentication, any role
// elevated  - JWT authentication and the admin role
pub mod elevated;
pub mod json;
pub mod params;
pub mod protected;
pub mod public;
