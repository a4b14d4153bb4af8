pub mod auth;
pub mod rate_limit;
pub mod response;

pub use auth::{jwt_auth_middleware, require_admin_middleware, AuthUser};
pub use rate_limit::rate_limit_middleware;
pub use response::{ApiResponse, ApiResult};
