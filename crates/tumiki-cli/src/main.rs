mod cli;
mod commands;
mod output;

use anyhow::Result;
use clap::Parser;
use colored::Colorize;

use cli::{Cli, Commands, CredentialCommands, TokenCommands};
use output::{print_error, print_success};

#[tokio::main]
async fn main() {
    // FIREBASE_* and JWT_SECRET may come from a local .env file
    let _ = dotenvy::dotenv();

    if let Err(e) = run().await {
        print_error(&format!("{e:#}"));
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    match &cli.command {
        Commands::HashPassword(args) => {
            println!("{}", commands::password::hash(&args.password)?);
        }
        Commands::Token(args) => match &args.command {
            TokenCommands::Issue(issue_args) => {
                println!("{}", commands::token::issue(issue_args)?);
            }
            TokenCommands::Verify(verify_args) => {
                let claims = commands::token::verify(&verify_args.secret, &verify_args.token)?;
                output::print_json(&serde_json::to_value(&claims)?)?;
            }
        },
        Commands::Credential(args) => match &args.command {
            CredentialCommands::Put(put_args) => {
                let adapter = commands::credential::firestore_adapter(&put_args.firestore)?;
                let id = commands::credential::put(adapter, put_args).await?;
                print_success(&format!(
                    "Stored credential {} (role: {})",
                    id.cyan(),
                    put_args.role.cyan()
                ));
            }
        },
    }

    Ok(())
}
