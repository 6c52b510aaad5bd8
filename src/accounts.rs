use std::path::Path;

use tracing::debug;

use crate::error::{QifError, Result};
use crate::store::RuleStore;

/// Read account names from column `field` (1-based) of a headerless CSV.
pub fn read_accounts(csv_path: &Path, field: usize, delimiter: u8) -> Result<Vec<String>> {
    if field == 0 {
        return Err(QifError::Other("field index starts at 1".to_string()));
    }
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .delimiter(delimiter)
        .flexible(true)
        .from_path(csv_path)?;

    let mut accounts = Vec::new();
    for (n, record) in rdr.records().enumerate() {
        let record = record?;
        let name = record.get(field - 1).ok_or_else(|| {
            QifError::Other(format!("line {} has no column {field}", n + 1))
        })?;
        let name = name.trim();
        if !name.is_empty() {
            accounts.push(name.to_string());
        }
    }
    debug!(count = accounts.len(), path = %csv_path.display(), "read accounts");
    Ok(accounts)
}

/// Add each account as a category. Categories already in the store keep
/// their rules. Returns how many were added.
pub fn merge_accounts(store: &mut RuleStore, accounts: &[String]) -> usize {
    accounts
        .iter()
        .filter(|name| store.add_category(name))
        .count()
}
