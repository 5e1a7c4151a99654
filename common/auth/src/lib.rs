pub mod claims;
pub mod codec;
pub mod config;
pub mod error;
pub mod extractors;
pub mod gate;
pub mod guards;
pub mod middleware;
pub mod password;
pub mod roles;

pub use claims::{Claims, TokenSubject};
pub use codec::TokenCodec;
pub use config::{InvalidTtl, JwtConfig, DEFAULT_TTL_SECONDS, MAX_TTL_SECONDS};
pub use error::{AuthError, AuthResult, ReasonCode, TokenError};
pub use extractors::AuthContext;
pub use gate::{authenticate, parse_bearer};
pub use guards::{EmptyRoleSet, RoleGate};
pub use middleware::{authenticate_request, authorize_request};
pub use password::{hash_password, Argon2PasswordVerifier, PasswordError, PasswordVerifier};
pub use roles::{ALL_ROLES, ROLE_ADMIN, ROLE_BUYER, ROLE_SELLER};
