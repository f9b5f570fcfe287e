pub mod auth;
pub mod extract;
pub mod response;
pub mod roles;

pub use auth::{jwt_auth_middleware, AuthUser};
pub use extract::{JsonBody, ValidatedJson};
pub use response::{ApiResponse, ApiResult};
pub use roles::{require_roles, ADMIN, ADMIN_OR_CRA, CRA};
