//! 认证与授权
//!
//! JWT 令牌体系 + Argon2 口令哈希 + 路由级权限检查中间件。

pub mod jwt;
pub mod middleware;
pub mod password;

pub use jwt::{Claims, CurrentUser, JwtConfig, JwtError, JwtService};
pub use middleware::{authorize, require_auth};
