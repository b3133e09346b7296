//! Authentication and authorization module

pub mod clock;
pub mod credentials;
pub mod gateway;
pub mod jwt;
pub mod middleware;
pub mod password;

pub use clock::{Clock, ManualClock, SystemClock};
pub use credentials::{CredentialRecord, CredentialStore, StaticCredentialStore};
pub use gateway::{AuthFailure, AuthGateway, Identity, LoginOutcome, UserProfile};
pub use jwt::{Claims, IssuedToken, TokenCodec, TokenError};
pub use middleware::{bearer_auth_middleware, extract_token, AuthContext};
pub use password::{PasswordHasher, PasswordScheme};
