use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cli_style;
use cli_style::get_styles;

use mindtune_server::profile::{normalize, ProfileStore, SqliteProfileStore, UserProfile};

fn parse_path(s: &str) -> Result<PathBuf> {
    let original_path = PathBuf::from(s);
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
#[command(styles=get_styles())]
struct CliArgs {
    /// Path to the SQLite profile database.
    #[clap(value_parser = parse_path)]
    pub db_path: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Shows the emails of all users with a profile.
    List,

    /// Prints the stored profile document of a user.
    Show { email: String },

    /// Replaces a user's profile with the JSON object in the given file.
    Import {
        email: String,
        #[clap(value_parser = parse_path)]
        json_file: PathBuf,
    },

    /// Prints the normalized feature vector of a user's profile.
    Features { email: String },

    /// Deletes a user's profile.
    Delete { email: String },
}

fn run(args: CliArgs) -> Result<()> {
    let store = SqliteProfileStore::new(&args.db_path)
        .with_context(|| format!("Failed to open profile database {:?}", args.db_path))?;

    match args.command {
        Command::List => {
            for email in store.list_emails()? {
                println!("{}", email);
            }
        }
        Command::Show { email } => match store.get_document(&email)? {
            Some(document) => println!("{}", serde_json::to_string_pretty(&document)?),
            None => bail!("No profile for {}", email),
        },
        Command::Import { email, json_file } => {
            let content = std::fs::read_to_string(&json_file)
                .with_context(|| format!("Failed to read {:?}", json_file))?;
            let document: serde_json::Value = serde_json::from_str(&content)
                .with_context(|| format!("{:?} is not valid JSON", json_file))?;
            let profile = UserProfile::from_document(&document)?;
            store.save_profile(&email, &profile)?;
            println!("Imported profile for {}", email);
        }
        Command::Features { email } => {
            let profile = store
                .get_profile(&email)?
                .with_context(|| format!("No profile for {}", email))?;
            for (name, value) in normalize(&profile).named() {
                println!("{:<28} {}", name, value);
            }
        }
        Command::Delete { email } => {
            if store.delete_profile(&email)? {
                println!("Deleted profile for {}", email);
            } else {
                bail!("No profile for {}", email);
            }
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    run(CliArgs::parse())
}
