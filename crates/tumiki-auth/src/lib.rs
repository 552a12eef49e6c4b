//! Authentication for the Tumiki service.
//!
//! - [`password`]: Argon2id hashing, plus verification of legacy bcrypt hashes.
//! - [`session`]: stateless HS256 session tokens with a fixed validity window.
//! - [`credentials`]: credential records and where they are looked up.
//! - [`login`]: the login flow (lookup, verify, issue).
//! - [`middleware`]: axum extractors for bearer-authenticated routes.

pub mod credentials;
pub mod error;
pub mod login;
pub mod middleware;
pub mod password;
pub mod session;

pub use credentials::{AdapterCredentialStore, Credential, CredentialStore};
pub use error::{AuthError, AuthResult};
pub use login::{LoginOutcome, LoginService, LoginUser};
pub use middleware::{AdminAuth, AuthState, BearerAuth};
pub use session::{SessionClaims, SessionIdentity, SessionTokenIssuer};
