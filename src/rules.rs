use std::collections::BTreeMap;
use std::fmt;

use regex::RegexBuilder;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{QifError, Result};
use crate::models::Transaction;

/// Fields a guru rule may target. `category` and pass-through lines are
/// bookkeeping, never matched against.
pub const MATCHABLE_FIELDS: [&str; 6] = ["date", "amount", "payee", "number", "memo", "filename"];

/// Matched substring per rule field, `None` where the field did not match.
pub type MatchMap = BTreeMap<String, Option<String>>;

/// A stored categorization rule. Serialized as a bare string (basic) or
/// as an object of field -> regex (guru), so existing config files load
/// unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Rule {
    /// Whole-word, case-insensitive match against the payee.
    Basic(String),
    /// Every listed field must match its pattern.
    Guru(BTreeMap<String, String>),
}

impl Rule {
    pub fn basic(text: impl Into<String>) -> Rule {
        Rule::Basic(text.into())
    }

    pub fn guru<K, V>(fields: impl IntoIterator<Item = (K, V)>) -> Rule
    where
        K: Into<String>,
        V: Into<String>,
    {
        Rule::Guru(
            fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Normalize to the field-map form used for evaluation.
    pub fn rulify(&self) -> Option<Rule> {
        match self {
            Rule::Basic(text) if text.trim().is_empty() => None,
            Rule::Basic(text) => Some(Rule::guru([("payee", word_pattern(text))])),
            Rule::Guru(fields) if fields.is_empty() => None,
            Rule::Guru(_) => Some(self.clone()),
        }
    }

    /// Collapse a single payee word match back to its plain text so the
    /// config file stays readable. Basic text is trimmed, other rules pass
    /// through.
    pub fn unrulify(self) -> Option<Rule> {
        match self {
            Rule::Basic(text) if text.trim().is_empty() => None,
            Rule::Basic(text) => Some(Rule::Basic(text.trim().to_string())),
            Rule::Guru(fields) if fields.is_empty() => None,
            Rule::Guru(fields) => {
                if fields.len() == 1 {
                    if let Some(text) = fields.get("payee").and_then(|p| unword_pattern(p)) {
                        return Some(Rule::Basic(text));
                    }
                }
                Some(Rule::Guru(fields))
            }
        }
    }

    /// Evaluate against a transaction. True only if every field matches.
    pub fn matches(&self, txn: &Transaction) -> (bool, MatchMap) {
        let mut found = MatchMap::new();
        let Some(Rule::Guru(fields)) = self.rulify() else {
            return (false, found);
        };
        for (field, pattern) in &fields {
            let hit = txn
                .lookup(&field.to_lowercase())
                .and_then(|value| search(pattern, value));
            found.insert(field.clone(), hit);
        }
        let all = found.values().all(Option::is_some);
        (all, found)
    }

    /// Reject rules that could never be stored: empty ones and guru rules
    /// naming a field outside `MATCHABLE_FIELDS`.
    pub fn validate(&self) -> Result<()> {
        match self {
            Rule::Basic(text) if text.trim().is_empty() => {
                Err(QifError::InvalidRule("empty match".to_string()))
            }
            Rule::Basic(_) => Ok(()),
            Rule::Guru(fields) if fields.is_empty() => {
                Err(QifError::InvalidRule("rule has no field".to_string()))
            }
            Rule::Guru(fields) => {
                for field in fields.keys() {
                    if !is_matchable(field) {
                        return Err(QifError::InvalidRule(format!(
                            "'{field}' is not a matchable field"
                        )));
                    }
                }
                Ok(())
            }
        }
    }
}

impl From<&str> for Rule {
    fn from(text: &str) -> Self {
        Rule::Basic(text.to_string())
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rule::Basic(text) => f.write_str(text),
            Rule::Guru(fields) => {
                let parts: Vec<String> = fields.iter().map(|(k, v)| format!("{k}=/{v}/")).collect();
                f.write_str(&parts.join(", "))
            }
        }
    }
}

pub fn is_matchable(field: &str) -> bool {
    MATCHABLE_FIELDS.contains(&field.to_lowercase().as_str())
}

/// Legacy basic form: does `keyword` appear as a whole word in `payee`?
pub fn is_match(keyword: &str, payee: &str) -> bool {
    search(&word_pattern(keyword), payee).is_some()
}

fn word_pattern(text: &str) -> String {
    format!(r"\b{}\b", regex::escape(text))
}

/// Inverse of `word_pattern`, `None` unless the pattern is exactly an
/// escaped literal between word boundaries.
fn unword_pattern(pattern: &str) -> Option<String> {
    let inner = pattern.strip_prefix(r"\b")?.strip_suffix(r"\b")?;
    let mut text = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            text.push(chars.next()?);
        } else {
            text.push(c);
        }
    }
    if text.trim().is_empty() || regex::escape(&text) != inner {
        return None;
    }
    Some(text)
}

fn search(pattern: &str, value: &str) -> Option<String> {
    match RegexBuilder::new(pattern).case_insensitive(true).build() {
        Ok(re) => re.find(value).map(|m| m.as_str().to_string()),
        Err(e) => {
            debug!(pattern, error = %e, "ignoring invalid rule pattern");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Field;

    fn sully_txn() -> Transaction {
        Transaction::with_fields(&[
            (Field::Payee, "CARTE 16/02/2014 Sully bar"),
            (Field::Date, "16/02/2014"),
            (Field::Memo, "chouffe"),
        ])
    }

    #[test]
    fn test_rulify_basic() {
        let rule = Rule::basic("Art Brut").rulify().unwrap();
        assert_eq!(rule, Rule::guru([("payee", r"\bArt Brut\b")]));
        assert_eq!(Rule::basic("").rulify(), None);
        assert_eq!(Rule::Guru(BTreeMap::new()).rulify(), None);
    }

    #[test]
    fn test_rulify_guru_unchanged() {
        let rule = Rule::guru([("memo", "houf"), ("date", r"\d\d/02/2014")]);
        assert_eq!(rule.rulify(), Some(rule.clone()));
    }

    #[test]
    fn test_unrulify_roundtrip() {
        let rule = Rule::basic("alice").rulify().unwrap();
        assert_eq!(rule.unrulify(), Some(Rule::basic("alice")));

        let escaped = Rule::basic("A.B (shop)").rulify().unwrap();
        assert_eq!(escaped.unrulify(), Some(Rule::basic("A.B (shop)")));
    }

    #[test]
    fn test_unrulify_keeps_real_regex() {
        let rule = Rule::guru([("payee", r"\b\d+ bar\b")]);
        assert_eq!(rule.clone().unrulify(), Some(rule));
        let two = Rule::guru([("payee", r"\bSully\b"), ("memo", "houf")]);
        assert_eq!(two.clone().unrulify(), Some(two));
    }

    #[test]
    fn test_unrulify_whitespace_is_nothing() {
        assert_eq!(Rule::basic("   ").unrulify(), None);
        assert_eq!(Rule::Guru(BTreeMap::new()).unrulify(), None);
    }

    #[test]
    fn test_basic_rule_insensitive_case() {
        let (ok, found) = Rule::basic("sully bar").matches(&sully_txn());
        assert!(ok);
        assert_eq!(found["payee"].as_deref(), Some("Sully bar"));
    }

    #[test]
    fn test_basic_rule_no_partial_word() {
        assert!(!Rule::basic("sully ba").matches(&sully_txn()).0);
        assert!(!Rule::basic("Sull").matches(&sully_txn()).0);
    }

    #[test]
    fn test_guru_rule_all_fields_must_match() {
        let rule = Rule::guru([("memo", "houf"), ("date", r"\d\d/02/2014")]);
        let (ok, found) = rule.matches(&sully_txn());
        assert!(ok);
        assert_eq!(found["memo"].as_deref(), Some("houf"));
        assert_eq!(found["date"].as_deref(), Some("16/02/2014"));

        let rule = Rule::guru([("memo", "houf"), ("date", r"\d\d/03/2014")]);
        let (ok, found) = rule.matches(&sully_txn());
        assert!(!ok);
        assert_eq!(found["date"], None);
    }

    #[test]
    fn test_guru_rule_field_name_case_insensitive() {
        let rule = Rule::guru([("MEMO", "CHOUFFE")]);
        assert!(rule.matches(&sully_txn()).0);
    }

    #[test]
    fn test_missing_field_and_bad_regex_do_not_match() {
        let txn = sully_txn();
        assert!(!Rule::guru([("amount", ".*")]).matches(&txn).0);
        assert!(!Rule::guru([("nosuchfield", ".*")]).matches(&txn).0);
        let (ok, found) = Rule::guru([("payee", "(unclosed")]).matches(&txn);
        assert!(!ok);
        assert_eq!(found["payee"], None);
    }

    #[test]
    fn test_filename_is_matchable() {
        let mut txn = sully_txn();
        txn.filename = "exports/visa.qif".into();
        assert!(Rule::guru([("filename", "visa")]).matches(&txn).0);
    }

    #[test]
    fn test_validate() {
        assert!(Rule::basic("Sully").validate().is_ok());
        assert!(Rule::guru([("memo", "x"), ("filename", "y")]).validate().is_ok());
        assert!(matches!(
            Rule::guru([("category", "Bars")]).validate(),
            Err(QifError::InvalidRule(_))
        ));
        assert!(Rule::Guru(BTreeMap::new()).validate().is_err());
        assert!(Rule::basic(" ").validate().is_err());
    }

    #[test]
    fn test_is_match() {
        assert!(is_match("sully bar", "CARTE 16/02/2014 Sully bar"));
        assert!(is_match("16/02", "CARTE 16/02/2014 Sully bar"));
        assert!(!is_match("sully ba", "CARTE 16/02/2014 Sully bar"));
    }

    #[test]
    fn test_serde_shapes() {
        let rules: Vec<Rule> = serde_json::from_str(r#"["Sully", {"memo": "houf"}]"#).unwrap();
        assert_eq!(rules[0], Rule::basic("Sully"));
        assert_eq!(rules[1], Rule::guru([("memo", "houf")]));
        assert_eq!(serde_json::to_string(&rules).unwrap(), r#"["Sully",{"memo":"houf"}]"#);
    }
}
