use std::time::Duration;

use anyhow::Result;
use tumiki_auth::{SessionClaims, SessionIdentity, SessionTokenIssuer};

use crate::cli::IssueArgs;
use crate::commands::permission_value;

pub fn issue(args: &IssueArgs) -> Result<String> {
    if args.validity_hours == 0 {
        anyhow::bail!("--validity-hours must be greater than zero");
    }
    let issuer = SessionTokenIssuer::new(&args.secret)?
        .with_validity(Duration::from_secs(args.validity_hours * 60 * 60));
    let identity = SessionIdentity {
        id: args.subject.clone(),
        username: args.username.clone().unwrap_or_else(|| args.subject.clone()),
        role: args.role.clone(),
        permission: permission_value(&args.permissions),
    };
    Ok(issuer.issue(identity)?)
}

pub fn verify(secret: &str, token: &str) -> Result<SessionClaims> {
    let issuer = SessionTokenIssuer::new(secret)?;
    issuer
        .verify(token)
        .ok_or_else(|| anyhow::anyhow!("token is invalid or expired"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn issue_args(secret: &str) -> IssueArgs {
        IssueArgs {
            secret: secret.to_string(),
            subject: "alice".to_string(),
            username: Some("Alice".to_string()),
            role: "admin".to_string(),
            permissions: vec!["all".to_string()],
            validity_hours: 2,
        }
    }

    #[test]
    fn issued_token_verifies_with_the_same_secret() {
        let token = issue(&issue_args("s3cret")).unwrap();
        let claims = verify("s3cret", &token).unwrap();

        assert_eq!(claims.subject(), "alice");
        assert_eq!(claims.identity.username, "Alice");
        assert_eq!(claims.role(), "admin");
        assert_eq!(claims.identity.permission, json!("all"));
        assert_eq!(claims.exp - claims.iat, 2 * 60 * 60);
    }

    #[test]
    fn wrong_secret_or_garbage_is_rejected() {
        let token = issue(&issue_args("s3cret")).unwrap();
        assert!(verify("other", &token).is_err());
        assert!(verify("s3cret", "not-a-token").is_err());
    }

    #[test]
    fn zero_validity_is_refused() {
        let mut args = issue_args("s3cret");
        args.validity_hours = 0;
        assert!(issue(&args).is_err());
    }
}
