use std::collections::BTreeMap;
use std::path::PathBuf;

use colored::Colorize;
use dialoguer::Confirm;
use regex::Regex;
use rustyline::completion::Completer;
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::{Context, Editor, Helper};
use tracing::warn;

use crate::error::{QifError, Result};
use crate::models::{Field, Transaction};
use crate::qif::{count_without_payee, dump_to_buffer, parse_bytes};
use crate::rules::{is_match, is_matchable, Rule, MATCHABLE_FIELDS};
use crate::session::{Abort, Decision, Reviewer, Session, SessionStatus};
use crate::settings::Options;
use crate::store::{RuleStore, TagMatch};
use crate::suggest::{complete, complete_matches, highlight};

const BACK: &str = "<";
const GURU: &str = "@";

pub fn run(
    config: Option<PathBuf>,
    file: PathBuf,
    output: Option<PathBuf>,
    audit: bool,
    batch: bool,
    dry_run: bool,
) -> Result<SessionStatus> {
    let options = Options::new(config, file, output, dry_run, audit, batch)?;
    let mut store = RuleStore::load(&options.config)?;

    let raw = std::fs::read(&options.src)?;
    let mut transactions = parse_bytes(&raw, &options.source_name());

    let missing = count_without_payee(&transactions);
    if missing > 0 && !options.batch {
        let go_on = Confirm::new()
            .with_prompt(format!(
                "{missing} of {} transactions have no 'Payee' field. Continue?",
                transactions.len()
            ))
            .default(true)
            .interact()
            .unwrap_or(false);
        if !go_on {
            return Err(QifError::Other("aborted: transactions without payee".to_string()));
        }
    }

    let mut reviewer = TerminalReviewer::new()?;
    let report = Session::new(&mut store, &options).run(&mut transactions, &mut reviewer)?;

    match report.status {
        SessionStatus::Discarded => {
            println!("{}", "Edits discarded, nothing written.".yellow());
            return Ok(report.status);
        }
        SessionStatus::Interrupted => {
            println!(
                "{}",
                format!("Interrupted after {} transactions.", report.processed).yellow()
            );
        }
        SessionStatus::Completed => {}
    }

    let buffer = dump_to_buffer(&transactions);
    if options.dry_run {
        print!("{buffer}");
    } else {
        std::fs::write(&options.dest, &buffer)?;
        println!(
            "{}",
            format!(
                "Wrote {} transactions to {} ({} rules learned, {} skipped)",
                transactions.len(),
                options.dest.display(),
                report.learned,
                report.skipped
            )
            .green()
        );
    }
    Ok(report.status)
}

// ---------------------------------------------------------------------------
// Prompts
// ---------------------------------------------------------------------------

/// Tab completion over the candidates of the current prompt.
#[derive(Default)]
struct Candidates(Vec<String>);

impl Completer for Candidates {
    type Candidate = String;

    fn complete(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> rustyline::Result<(usize, Vec<String>)> {
        let found = complete(&self.0, &line[..pos])
            .into_iter()
            .map(str::to_string)
            .collect();
        Ok((0, found))
    }
}

impl Hinter for Candidates {
    type Hint = String;
}

impl Highlighter for Candidates {}

impl Validator for Candidates {}

impl Helper for Candidates {}

/// Ctrl+C stops the session, Ctrl+D (or any other read failure) discards it.
fn abort_from(err: &ReadlineError) -> Abort {
    match err {
        ReadlineError::Interrupted => Abort::Interrupt,
        ReadlineError::Eof => Abort::Discard,
        other => {
            warn!(error = %other, "prompt failed, discarding session");
            Abort::Discard
        }
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

fn parse_amount(raw: &str) -> f64 {
    raw.replace(',', "").trim().parse().unwrap_or(0.0)
}

fn print_transaction(txn: &Transaction, suggestion: Option<&TagMatch>) {
    println!("{}", "\u{2500}".repeat(60));
    let amount = txn.get(Field::Amount).unwrap_or_default();
    let amount = if parse_amount(amount) > 0.0 {
        amount.green()
    } else {
        amount.red()
    };
    println!("  Amount..: {amount}");
    let payee_hit = suggestion
        .and_then(|m| m.matches.get("payee"))
        .and_then(|hit| hit.as_deref());
    println!("  Payee...: {}", highlight(txn.payee().unwrap_or_default(), payee_hit));
    for (label, field) in [("Date", Field::Date), ("Memo", Field::Memo), ("Number", Field::Number)] {
        if let Some(value) = txn.get(field).filter(|v| !v.is_empty()) {
            println!("  {label:.<8}: {value}");
        }
    }
    if let Some(found) = suggestion {
        println!("  Category: {} ({})", found.category.green(), found.rule);
    }
}

struct TerminalReviewer {
    editor: Editor<Candidates, DefaultHistory>,
}

impl TerminalReviewer {
    fn new() -> Result<Self> {
        let mut editor = Editor::new()?;
        editor.set_helper(Some(Candidates::default()));
        Ok(Self { editor })
    }

    fn ask(&mut self, prompt: &str, candidates: Vec<String>) -> std::result::Result<String, Abort> {
        if let Some(helper) = self.editor.helper_mut() {
            helper.0 = candidates;
        }
        self.editor
            .readline(&format!("{prompt}: "))
            .map_err(|e| abort_from(&e))
    }

    fn confirm(&mut self, prompt: &str) -> std::result::Result<bool, Abort> {
        let answer = self.ask(&format!("{prompt} [y/N]"), vec!["y".into(), "n".into()])?;
        Ok(is_yes(&answer))
    }

    /// `None` means the category is removed.
    fn query_category(&mut self, cached: Option<&str>, categories: &[&str]) -> std::result::Result<Option<String>, Abort> {
        let names = categories.iter().map(|c| c.to_string()).collect();
        let category = self.ask("Category", names)?.trim().to_string();
        if !category.is_empty() {
            return Ok(Some(category));
        }
        if let Some(cached) = cached {
            if !self.confirm("Remove existing category")? {
                return Ok(Some(cached.to_string()));
            }
        }
        Ok(None)
    }

    /// Outer `None` goes back to the category prompt; inner `None` tags
    /// without learning a rule.
    fn query_rule(&mut self, txn: &Transaction) -> std::result::Result<Option<Option<Rule>>, Abort> {
        let payee = txn.payee().unwrap_or_default();
        loop {
            let input = self.ask(
                &format!("Match ({GURU} for a multi-field rule, {BACK} to go back)"),
                complete_matches(payee),
            )?;
            let rule = match input.trim() {
                BACK => return Ok(None),
                "" => {
                    println!("{} Match accepted: {}", "\u{2714}".green(), "<none>".red());
                    return Ok(Some(None));
                }
                GURU => match self.query_guru_rule(txn)? {
                    Some(rule) => rule,
                    None => continue,
                },
                text => Rule::basic(text),
            };
            let accepted = match &rule {
                Rule::Basic(text) => is_match(text, payee),
                Rule::Guru(_) => rule.matches(txn).0,
            };
            if accepted {
                println!("{} Match accepted: {}", "\u{2714}".green(), rule);
                return Ok(Some(Some(rule)));
            }
            println!("{} Match rejected: {}", "\u{2716}".red(), rule.to_string().red());
        }
    }

    /// Collect field/pattern pairs until an empty field name.
    fn query_guru_rule(&mut self, txn: &Transaction) -> std::result::Result<Option<Rule>, Abort> {
        let fields: Vec<String> = MATCHABLE_FIELDS
            .iter()
            .filter(|f| txn.lookup(f).is_some())
            .map(|f| f.to_string())
            .collect();
        let mut rule = BTreeMap::new();
        loop {
            let field = self.ask("Field", fields.clone())?.trim().to_lowercase();
            if field.is_empty() {
                break;
            }
            if !is_matchable(&field) {
                println!("{} '{field}' cannot be matched", "\u{2716}".red());
                continue;
            }
            let value = txn.lookup(&field).unwrap_or_default();
            println!("  {}: {value}", field.bold());
            let pattern = self.ask("Pattern", complete_matches(value))?;
            if let Err(e) = Regex::new(&pattern) {
                println!("{} {e}", "\u{2716}".red());
                continue;
            }
            rule.insert(field, pattern);
        }
        Ok((!rule.is_empty()).then_some(Rule::Guru(rule)))
    }
}

impl Reviewer for TerminalReviewer {
    fn review(
        &mut self,
        txn: &Transaction,
        suggestion: Option<&TagMatch>,
        categories: &[&str],
    ) -> std::result::Result<Decision, Abort> {
        print_transaction(txn, suggestion);
        let cached = suggestion.map(|m| m.category.as_str()).or(txn.category());
        if let Some(category) = cached {
            if !self.confirm(&format!("Edit '{category}' category"))? {
                return Ok(Decision::Keep);
            }
        }
        loop {
            let Some(category) = self.query_category(cached, categories)? else {
                println!("Category: {}", "<none>".red());
                return Ok(Decision::Tag {
                    category: None,
                    rule: None,
                });
            };
            println!("Category: {}", category.green());
            if let Some(rule) = self.query_rule(txn)? {
                return Ok(Decision::Tag {
                    category: Some(category),
                    rule,
                });
            }
        }
    }

    fn finish(&mut self) -> std::result::Result<(), Abort> {
        self.ask("Press Enter to save (Ctrl+D to discard edits)", Vec::new())
            .map(|_| ())
    }
}
