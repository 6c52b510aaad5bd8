use std::path::PathBuf;

use crate::error::{QifError, Result};
use crate::store::Persistence;

const CONFIG_FILENAME: &str = ".qiftag.json";

/// Options for one tagging run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    pub config: PathBuf,
    pub src: PathBuf,
    pub dest: PathBuf,
    pub dry_run: bool,
    pub audit: bool,
    pub batch: bool,
}

impl Options {
    /// `dest` falls back to `src` (edit in place).
    pub fn new(
        config: Option<PathBuf>,
        src: PathBuf,
        dest: Option<PathBuf>,
        dry_run: bool,
        audit: bool,
        batch: bool,
    ) -> Result<Self> {
        if dry_run && dest.is_some() {
            return Err(QifError::ConflictingOptions(
                "cannot activate dry-run mode when output is set".to_string(),
            ));
        }
        if audit && batch {
            return Err(QifError::ConflictingOptions(
                "cannot activate batch mode when audit mode is already on".to_string(),
            ));
        }
        Ok(Self {
            config: config.unwrap_or_else(default_config_path),
            dest: dest.unwrap_or_else(|| src.clone()),
            src,
            dry_run,
            audit,
            batch,
        })
    }

    pub fn persistence(&self) -> Persistence {
        if self.dry_run {
            Persistence::DryRun
        } else {
            Persistence::Write(self.config.clone())
        }
    }

    /// Source path as stamped on each transaction's `filename`.
    pub fn source_name(&self) -> String {
        self.src.to_string_lossy().to_string()
    }
}

pub fn default_config_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_FILENAME)
}

pub fn config_path_or_default(config: Option<PathBuf>) -> PathBuf {
    config.unwrap_or_else(default_config_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dest_defaults_to_src() {
        let opts = Options::new(None, "in.qif".into(), None, false, false, false).unwrap();
        assert_eq!(opts.dest, opts.src);
        assert!(opts.config.ends_with(".qiftag.json"));
    }

    #[test]
    fn test_audit_and_batch_conflict() {
        let res = Options::new(None, "in.qif".into(), None, false, true, true);
        assert!(matches!(res, Err(QifError::ConflictingOptions(_))));
    }

    #[test]
    fn test_dry_run_and_output_conflict() {
        let res = Options::new(None, "in.qif".into(), Some("out.qif".into()), true, false, false);
        assert!(matches!(res, Err(QifError::ConflictingOptions(_))));
    }

    #[test]
    fn test_persistence_follows_dry_run() {
        let opts = Options::new(Some("tags.json".into()), "in.qif".into(), None, true, false, false).unwrap();
        assert_eq!(opts.persistence(), Persistence::DryRun);
        let opts = Options::new(Some("tags.json".into()), "in.qif".into(), None, false, false, false).unwrap();
        assert_eq!(opts.persistence(), Persistence::Write("tags.json".into()));
    }
}
