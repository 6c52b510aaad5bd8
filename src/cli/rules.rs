use std::path::PathBuf;

use comfy_table::{Cell, Table};

use crate::error::Result;
use crate::rules::Rule;
use crate::settings::config_path_or_default;
use crate::store::RuleStore;

pub fn list(config: Option<PathBuf>) -> Result<()> {
    let config = config_path_or_default(config);
    let store = RuleStore::load(&config)?;
    if store.is_empty() {
        println!("No rules in {}", config.display());
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Category", "Rule", "Kind"]);
    for (category, rules) in store.iter() {
        if rules.is_empty() {
            table.add_row(vec![Cell::new(category), Cell::new(""), Cell::new("")]);
        }
        for rule in rules {
            let kind = match rule {
                Rule::Basic(_) => "basic",
                Rule::Guru(_) => "guru",
            };
            table.add_row(vec![Cell::new(category), Cell::new(rule), Cell::new(kind)]);
        }
    }
    println!("Rules ({})\n{table}", config.display());
    Ok(())
}
