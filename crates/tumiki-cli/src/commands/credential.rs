use std::sync::Arc;

use anyhow::{Context, Result};
use tumiki_auth::{AdapterCredentialStore, Credential};
use tumiki_firestore::{FirestoreClient, FirestoreConfig, ServiceAccountKey, ServiceAccountTokenProvider};
use tumiki_storage::StorageAdapter;

use crate::cli::{FirestoreArgs, PutCredentialArgs};
use crate::commands::{password, permission_value};

/// Firestore-backed adapter built from the service-account settings.
pub fn firestore_adapter(args: &FirestoreArgs) -> Result<StorageAdapter> {
    let key = ServiceAccountKey::new(args.client_email.clone(), args.private_key.clone());
    let tokens = ServiceAccountTokenProvider::new(&key)
        .context("invalid service-account key")?
        .into_shared();
    let client = FirestoreClient::new(FirestoreConfig::new(args.project_id.clone()), tokens)?;
    Ok(StorageAdapter::new(Arc::new(client)))
}

pub fn build_credential(args: &PutCredentialArgs) -> Result<Credential> {
    if args.id.trim().is_empty() {
        anyhow::bail!("--id must not be empty");
    }
    Ok(Credential {
        id: args.id.clone(),
        password_hash: password::hash(&args.password)?,
        name: Some(args.name.clone()),
        role: args.role.clone(),
        permission: permission_value(&args.permissions),
        affiliation: args.affiliation.clone(),
        workplace: None,
        furigana: None,
    })
}

/// Hashes the password and writes the credential, returning the document id.
pub async fn put(adapter: StorageAdapter, args: &PutCredentialArgs) -> Result<String> {
    let credential = build_credential(args)?;
    let id = AdapterCredentialStore::new(adapter)
        .save(&credential)
        .await
        .with_context(|| format!("failed to store credential {}", credential.id))?;
    Ok(id)
}
