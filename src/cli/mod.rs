pub mod accounts;
pub mod rules;
pub mod tag;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "qiftag",
    about = "Enrich your QIF files with categories, learned from your corrections."
)]
pub struct Cli {
    /// Rule store in JSON format (default: ~/.qiftag.json)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Tag the transactions of a QIF file.
    Tag {
        /// QIF file to process
        file: PathBuf,
        /// Output file (default: edit the input file in place)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Review every transaction, even those with a known category
        #[arg(short, long)]
        audit: bool,
        /// Never prompt: apply known categories and leave the rest alone
        #[arg(short, long)]
        batch: bool,
        /// Print the result instead of writing files
        #[arg(short, long = "dry-run")]
        dry_run: bool,
    },
    /// Create categories from a CSV list of accounts.
    Accounts {
        /// CSV accounts file
        csv: PathBuf,
        /// Column holding the account name (1-based)
        field: usize,
        /// CSV delimiter: ',' or ';'
        #[arg(long, default_value = ",", value_parser = parse_delimiter)]
        delimiter: u8,
        /// Print the merged rule store instead of saving it
        #[arg(long = "dry-run")]
        dry_run: bool,
    },
    /// Inspect the rule store.
    Rules {
        #[command(subcommand)]
        command: RulesCommands,
    },
}

#[derive(Subcommand)]
pub enum RulesCommands {
    /// List every category and its rules.
    List,
}

fn parse_delimiter(s: &str) -> Result<u8, String> {
    match s {
        "," => Ok(b','),
        ";" => Ok(b';'),
        other => Err(format!("unsupported delimiter '{other}', use ',' or ';'")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tag_command() {
        let cli = Cli::try_parse_from(["qiftag", "-c", "tags.json", "tag", "in.qif", "-a"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("tags.json")));
        match cli.command {
            Commands::Tag { file, audit, batch, .. } => {
                assert_eq!(file, PathBuf::from("in.qif"));
                assert!(audit);
                assert!(!batch);
            }
            _ => panic!("expected tag command"),
        }
    }

    #[test]
    fn test_parse_accounts_delimiter() {
        let cli = Cli::try_parse_from(["qiftag", "accounts", "a.csv", "2", "--delimiter", ";"]).unwrap();
        match cli.command {
            Commands::Accounts { field, delimiter, .. } => {
                assert_eq!(field, 2);
                assert_eq!(delimiter, b';');
            }
            _ => panic!("expected accounts command"),
        }
        assert!(Cli::try_parse_from(["qiftag", "accounts", "a.csv", "2", "--delimiter", "|"]).is_err());
    }
}
