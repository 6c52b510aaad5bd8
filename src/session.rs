use tracing::{info, warn};

use crate::error::Result;
use crate::models::{Field, Transaction};
use crate::rules::Rule;
use crate::settings::Options;
use crate::store::{EditOutcome, Persistence, RuleStore, TagMatch};

/// What the user decided for one transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Accept the suggestion, or leave the record as it is when there is none.
    Keep,
    /// Tag with `category` (`None` clears it) and learn `rule`, if any.
    Tag {
        category: Option<String>,
        rule: Option<Rule>,
    },
}

/// Ways a prompt can end the session early.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Abort {
    /// Ctrl+C: stop here, keep what was committed.
    Interrupt,
    /// Ctrl+D: throw the whole session away.
    Discard,
}

/// The interactive side of a session.
pub trait Reviewer {
    fn review(
        &mut self,
        txn: &Transaction,
        suggestion: Option<&TagMatch>,
        categories: &[&str],
    ) -> std::result::Result<Decision, Abort>;

    /// Last chance to discard once every transaction has been seen.
    fn finish(&mut self) -> std::result::Result<(), Abort> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Completed,
    Interrupted,
    Discarded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionReport {
    pub status: SessionStatus,
    /// Transactions fully handled before the session ended.
    pub processed: usize,
    /// Edits that changed the rule store.
    pub learned: usize,
    /// Transactions without a payee, left untouched.
    pub skipped: usize,
}

/// One pass over a file's transactions, owning the rule store for its
/// duration. The store is snapshotted up front so a discarded session
/// leaves it exactly as it was.
pub struct Session<'a> {
    store: &'a mut RuleStore,
    snapshot: RuleStore,
    persistence: Persistence,
    audit: bool,
    batch: bool,
}

impl<'a> Session<'a> {
    pub fn new(store: &'a mut RuleStore, options: &Options) -> Self {
        Self::with_policy(store, options.persistence(), options.audit, options.batch)
    }

    pub fn with_policy(store: &'a mut RuleStore, persistence: Persistence, audit: bool, batch: bool) -> Self {
        let snapshot = store.clone();
        Self {
            store,
            snapshot,
            persistence,
            audit,
            batch,
        }
    }

    pub fn run<R: Reviewer>(mut self, transactions: &mut [Transaction], reviewer: &mut R) -> Result<SessionReport> {
        let mut report = SessionReport {
            status: SessionStatus::Completed,
            processed: 0,
            learned: 0,
            skipped: 0,
        };

        for txn in transactions.iter_mut() {
            match self.process(txn, reviewer)? {
                Ok(Some(EditOutcome::Updated)) => report.learned += 1,
                Ok(Some(EditOutcome::Unchanged)) => {}
                Ok(None) => report.skipped += 1,
                Err(abort) => return self.abort(abort, report),
            }
            report.processed += 1;
        }

        if !self.batch {
            if let Err(abort) = reviewer.finish() {
                return self.abort(abort, report);
            }
        }
        info!(processed = report.processed, learned = report.learned, "session complete");
        Ok(report)
    }

    /// `Ok(None)` when the transaction was skipped.
    #[allow(clippy::type_complexity)]
    fn process<R: Reviewer>(
        &mut self,
        txn: &mut Transaction,
        reviewer: &mut R,
    ) -> Result<std::result::Result<Option<EditOutcome>, Abort>> {
        if txn.payee().is_none() {
            warn!("skipping transaction without payee");
            return Ok(Ok(None));
        }
        let suggestion = self.store.find_tag_for(txn);
        // A category already in the file counts as known, like a rule match.
        let known = suggestion.is_some() || txn.category().is_some();

        let decision = if self.batch || (known && !self.audit) {
            Decision::Keep
        } else {
            match reviewer.review(txn, suggestion.as_ref(), &self.store.categories()) {
                Ok(decision) => decision,
                Err(abort) => return Ok(Err(abort)),
            }
        };

        let outcome = match decision {
            Decision::Keep => {
                if let Some(found) = &suggestion {
                    txn.set(Field::Category, Some(found.category.clone()));
                }
                EditOutcome::Unchanged
            }
            Decision::Tag { category, rule } => self.store.edit(
                txn,
                suggestion.as_ref().map(|m| m.category.as_str()),
                suggestion.as_ref().map(|m| &m.rule),
                category.as_deref(),
                rule,
                &self.persistence,
            )?,
        };
        Ok(Ok(Some(outcome)))
    }

    fn abort(self, abort: Abort, mut report: SessionReport) -> Result<SessionReport> {
        match abort {
            Abort::Interrupt => {
                warn!(processed = report.processed, "session interrupted, keeping edits so far");
                report.status = SessionStatus::Interrupted;
            }
            Abort::Discard => {
                warn!("session discarded, restoring rule store");
                if *self.store != self.snapshot {
                    *self.store = self.snapshot;
                    self.persistence.commit(self.store)?;
                }
                report.status = SessionStatus::Discarded;
            }
        }
        Ok(report)
    }
}
