use std::path::{Path, PathBuf};

use colored::Colorize;

use crate::accounts::{merge_accounts, read_accounts};
use crate::error::Result;
use crate::settings::config_path_or_default;
use crate::store::RuleStore;

pub fn run(config: Option<PathBuf>, csv: &Path, field: usize, delimiter: u8, dry_run: bool) -> Result<()> {
    let config = config_path_or_default(config);
    let accounts = read_accounts(csv, field, delimiter)?;
    let mut store = RuleStore::load(&config)?;
    let added = merge_accounts(&mut store, &accounts);

    if dry_run {
        print!("{}", store.to_json()?);
        return Ok(());
    }
    store.save(&config)?;
    println!(
        "{}",
        format!(
            "Added {added} of {} accounts as categories in {}",
            accounts.len(),
            config.display()
        )
        .green()
    );
    Ok(())
}
