use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "tumiki")]
#[command(about = "Tumiki operator CLI: password hashes, session tokens and credentials")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print an Argon2id hash of a password
    HashPassword(HashPasswordArgs),
    /// Issue or verify session tokens
    Token(TokenArgs),
    /// Manage login credentials in the document store
    Credential(CredentialArgs),
}

#[derive(clap::Args)]
pub struct HashPasswordArgs {
    /// Plaintext password
    pub password: String,
}

#[derive(clap::Args)]
pub struct TokenArgs {
    #[command(subcommand)]
    pub command: TokenCommands,
}

#[derive(Subcommand)]
pub enum TokenCommands {
    /// Mint a session token
    Issue(IssueArgs),
    /// Check a session token and print its claims
    Verify(VerifyArgs),
}

#[derive(clap::Args)]
pub struct IssueArgs {
    /// Signing secret (same value as the server's JWT secret)
    #[arg(long, env = "JWT_SECRET", hide_env_values = true)]
    pub secret: String,
    /// Account identifier the token is issued for
    #[arg(long)]
    pub subject: String,
    /// Display name carried in the token (defaults to the subject)
    #[arg(long)]
    pub username: Option<String>,
    /// Role carried in the token
    #[arg(long)]
    pub role: String,
    /// Permission entries (repeatable)
    #[arg(long = "permission")]
    pub permissions: Vec<String>,
    /// Validity window in hours
    #[arg(long, default_value_t = 24)]
    pub validity_hours: u64,
}

#[derive(clap::Args)]
pub struct VerifyArgs {
    /// Signing secret (same value as the server's JWT secret)
    #[arg(long, env = "JWT_SECRET", hide_env_values = true)]
    pub secret: String,
    /// Token to check
    pub token: String,
}

#[derive(clap::Args)]
pub struct CredentialArgs {
    #[command(subcommand)]
    pub command: CredentialCommands,
}

#[derive(Subcommand)]
pub enum CredentialCommands {
    /// Hash a password and write the credential to the employees collection,
    /// keeping stored fields it does not set
    Put(PutCredentialArgs),
}

#[derive(clap::Args)]
pub struct PutCredentialArgs {
    /// Login identifier (document id)
    #[arg(long)]
    pub id: String,
    /// Plaintext password, stored as an Argon2id hash
    #[arg(long)]
    pub password: String,
    /// Display name
    #[arg(long)]
    pub name: String,
    /// Role
    #[arg(long)]
    pub role: String,
    /// Permission entries (repeatable)
    #[arg(long = "permission")]
    pub permissions: Vec<String>,
    /// Affiliation
    #[arg(long)]
    pub affiliation: Option<String>,
    #[command(flatten)]
    pub firestore: FirestoreArgs,
}

#[derive(clap::Args)]
pub struct FirestoreArgs {
    /// Firestore project id
    #[arg(long, env = "FIREBASE_PROJECT_ID")]
    pub project_id: String,
    /// Service-account email
    #[arg(long, env = "FIREBASE_CLIENT_EMAIL")]
    pub client_email: String,
    /// Service-account private key (PEM, literal `\n` accepted)
    #[arg(long, env = "FIREBASE_PRIVATE_KEY", hide_env_values = true)]
    pub private_key: String,
}
