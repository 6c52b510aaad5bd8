use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{QifError, Result};
use crate::models::{Field, Transaction};
use crate::rules::{MatchMap, Rule};

/// Where store mutations go once `edit` has applied them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Persistence {
    /// Save to the config file after every change.
    Write(PathBuf),
    /// Keep changes in memory for the rest of the session.
    DryRun,
}

impl Persistence {
    pub fn commit(&self, store: &RuleStore) -> Result<()> {
        match self {
            Self::Write(path) => store.save(path),
            Self::DryRun => {
                debug!("dry-run: rule store kept in memory");
                Ok(())
            }
        }
    }
}

/// Best rule found for a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagMatch {
    pub category: String,
    pub rule: Rule,
    pub matches: MatchMap,
}

impl TagMatch {
    /// Ranking key: matched fields first, then total matched characters.
    fn score(&self) -> (usize, usize) {
        let hits: Vec<&String> = self.matches.values().flatten().collect();
        let length = hits.iter().map(|s| s.chars().count()).sum();
        (hits.len(), length)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOutcome {
    Unchanged,
    Updated,
}

/// Category -> rules cache, persisted as a JSON object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleStore {
    categories: BTreeMap<String, Vec<Rule>>,
}

impl RuleStore {
    #[cfg(test)]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the store at `path`, or an empty one if the file is missing.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "no rule store yet, starting empty");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let store: RuleStore = serde_json::from_str(&content).map_err(|source| QifError::Config {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), categories = store.len(), "loaded rule store");
        Ok(store)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        std::fs::write(path, self.to_json()?)?;
        info!(path = %path.display(), categories = self.len(), "saved rule store");
        Ok(())
    }

    /// Sorted keys, 4-space indent, trailing newline. Stable across saves.
    pub fn to_json(&self) -> Result<String> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.serialize(&mut ser)?;
        buf.push(b'\n');
        String::from_utf8(buf).map_err(|e| QifError::Other(e.to_string()))
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Known category names, sorted. Feeds prompt completion.
    pub fn categories(&self) -> Vec<&str> {
        self.categories.keys().map(String::as_str).collect()
    }

    #[cfg(test)]
    pub fn contains_category(&self, category: &str) -> bool {
        self.categories.contains_key(category)
    }

    pub fn rules(&self, category: &str) -> Option<&[Rule]> {
        self.categories.get(category).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Rule])> {
        self.categories
            .iter()
            .map(|(c, rules)| (c.as_str(), rules.as_slice()))
    }

    /// Register a category with no rule yet. Existing categories are left
    /// alone. Returns whether the category was new.
    pub fn add_category(&mut self, category: &str) -> bool {
        if self.categories.contains_key(category) {
            return false;
        }
        self.categories.insert(category.to_string(), Vec::new());
        true
    }

    /// Best matching (category, rule) for `txn` across the whole store.
    pub fn find_tag_for(&self, txn: &Transaction) -> Option<TagMatch> {
        let mut best: Option<(TagMatch, (usize, usize))> = None;
        for (category, rules) in &self.categories {
            for rule in rules {
                let (ok, matches) = rule.matches(txn);
                if !ok {
                    continue;
                }
                let candidate = TagMatch {
                    category: category.clone(),
                    rule: rule.clone(),
                    matches,
                };
                let score = candidate.score();
                debug!(category = %category, rule = %rule, ?score, "rule matched");
                if best.as_ref().map_or(true, |(_, s)| score > *s) {
                    best = Some((candidate, score));
                }
            }
        }
        best.map(|(m, _)| m)
    }

    /// Learn from the user's decision on `txn`.
    ///
    /// `cached_*` is what `find_tag_for` suggested, `new_*` what the user
    /// settled on. A category change moves the cached rule out of its old
    /// category (dropping the category once empty) and files the new rule
    /// under the new one. A rule change within the same category replaces
    /// the rule. Anything else leaves the store alone. The transaction's
    /// category is set to `new_category` in every case.
    pub fn edit(
        &mut self,
        txn: &mut Transaction,
        cached_category: Option<&str>,
        cached_rule: Option<&Rule>,
        new_category: Option<&str>,
        new_rule: Option<Rule>,
        persistence: &Persistence,
    ) -> Result<EditOutcome> {
        let new_rule = new_rule.and_then(Rule::unrulify);
        if let Some(rule) = &new_rule {
            rule.validate()?;
        }
        let cached_category = cached_category.filter(|c| !c.is_empty());
        let new_category = new_category.map(str::trim).filter(|c| !c.is_empty());

        txn.set(Field::Category, new_category.map(str::to_string));

        let mut changed = false;
        if new_category != cached_category {
            if let (Some(category), Some(rule)) = (cached_category, cached_rule) {
                changed |= self.remove_rule(category, rule);
            }
            if let (Some(category), Some(rule)) = (new_category, new_rule) {
                changed |= self.add_rule(category, rule);
            }
        } else if let Some(rule) = new_rule.filter(|r| Some(r) != cached_rule) {
            if let Some(category) = new_category {
                if let Some(old) = cached_rule {
                    changed |= self.remove_rule(category, old);
                }
                changed |= self.add_rule(category, rule);
            }
        }

        if !changed {
            return Ok(EditOutcome::Unchanged);
        }
        info!(
            from = cached_category.unwrap_or("<none>"),
            to = new_category.unwrap_or("<none>"),
            "rule store updated"
        );
        persistence.commit(self)?;
        Ok(EditOutcome::Updated)
    }

    fn remove_rule(&mut self, category: &str, rule: &Rule) -> bool {
        let Some(rules) = self.categories.get_mut(category) else {
            return false;
        };
        let Some(pos) = rules.iter().position(|r| r == rule) else {
            return false;
        };
        rules.remove(pos);
        if rules.is_empty() {
            self.categories.remove(category);
        }
        true
    }

    fn add_rule(&mut self, category: &str, rule: Rule) -> bool {
        let rules = self.categories.entry(category.to_string()).or_default();
        if rules.contains(&rule) {
            return false;
        }
        rules.push(rule);
        true
    }
}

impl FromIterator<(String, Vec<Rule>)> for RuleStore {
    fn from_iter<I: IntoIterator<Item = (String, Vec<Rule>)>>(iter: I) -> Self {
        Self {
            categories: iter.into_iter().collect(),
        }
    }
}
