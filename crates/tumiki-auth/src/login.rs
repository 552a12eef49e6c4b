//! The login flow.
//!
//! `received -> credential lookup -> password verify -> token issue`. Every
//! failing branch ends in [`AuthError::InvalidCredentials`], and an unknown
//! identifier still pays for one password verification.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::credentials::{Credential, CredentialStore};
use crate::error::{AuthError, AuthResult};
use crate::password::{dummy_hash, verify_password_blocking};
use crate::session::{SessionIdentity, SessionTokenIssuer};

/// Profile returned to the client after a successful login.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoginUser {
    pub id: String,
    pub username: String,
    pub name: Option<String>,
    pub role: String,
    pub permission: Value,
    pub affiliation: Option<String>,
    pub workplace: Option<String>,
    pub furigana: Option<String>,
}

impl From<&Credential> for LoginUser {
    fn from(c: &Credential) -> Self {
        Self {
            id: c.id.clone(),
            username: c.id.clone(),
            name: c.name.clone(),
            role: c.role.clone(),
            permission: c.permission.clone(),
            affiliation: c.affiliation.clone(),
            workplace: c.workplace.clone(),
            furigana: c.furigana.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginOutcome {
    pub token: String,
    pub user: LoginUser,
}

#[derive(Clone)]
pub struct LoginService {
    credentials: Arc<dyn CredentialStore>,
    issuer: Arc<SessionTokenIssuer>,
}

impl LoginService {
    pub fn new(credentials: Arc<dyn CredentialStore>, issuer: Arc<SessionTokenIssuer>) -> Self {
        Self {
            credentials,
            issuer,
        }
    }

    pub fn issuer(&self) -> &Arc<SessionTokenIssuer> {
        &self.issuer
    }

    pub async fn login(&self, username: &str, password: &str) -> AuthResult<LoginOutcome> {
        let username = username.trim();
        if username.is_empty() || password.is_empty() {
            return Err(AuthError::validation("username and password are required"));
        }

        let credential = self.credentials.find_credential(username).await?;
        let stored_hash = credential
            .as_ref()
            .map_or_else(|| dummy_hash().to_string(), |c| c.password_hash.clone());
        let matches = verify_password_blocking(password.to_string(), stored_hash).await?;

        let credential = match credential {
            Some(c) if matches => c,
            other => {
                tracing::info!(found = other.is_some(), "login rejected");
                return Err(AuthError::InvalidCredentials);
            }
        };

        let token = self.issuer.issue(SessionIdentity {
            id: credential.id.clone(),
            username: credential.id.clone(),
            role: credential.role.clone(),
            permission: credential.permission.clone(),
        })?;
        tracing::info!(subject = %credential.id, role = %credential.role, "login succeeded");

        Ok(LoginOutcome {
            token,
            user: LoginUser::from(&credential),
        })
    }
}
