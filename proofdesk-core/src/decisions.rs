//! Decision Store: the reviewer's unsaved decisions (the dirty set).
//!
//! Keyed by issue id with at most one entry per issue; later decisions
//! overwrite earlier ones. The store knows which issue ids exist in the
//! loaded item and refuses decisions for anything else.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::DecisionError;
use crate::types::{Decision, DecisionDraft, DecisionPayload, DecisionType};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecisionStore {
    known: BTreeSet<String>,
    entries: BTreeMap<String, Decision>,
}

impl DecisionStore {
    pub fn for_issues<I, S>(issue_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { known: issue_ids.into_iter().map(Into::into).collect(), entries: BTreeMap::new() }
    }

    /// Inserts or replaces the decision for `issue_id`.
    ///
    /// # Errors
    ///
    /// `UnknownIssue` for ids outside the loaded item, and
    /// `MissingModifiedContent` for a modified decision without content.
    pub fn add_decision(
        &mut self,
        issue_id: &str,
        draft: DecisionDraft,
    ) -> Result<&Decision, DecisionError> {
        self.ensure_known(issue_id)?;
        let decision = Decision::from_draft(draft);
        if decision.decision_type == DecisionType::Modified && decision.modified_content.is_none() {
            return Err(DecisionError::MissingModifiedContent(issue_id.to_owned()));
        }
        self.entries.insert(issue_id.to_owned(), decision);
        Ok(&self.entries[issue_id])
    }

    pub fn clear_decision(&mut self, issue_id: &str) -> Option<Decision> {
        self.entries.remove(issue_id)
    }

    pub fn clear_all(&mut self) -> usize {
        let cleared = self.entries.len();
        self.entries.clear();
        cleared
    }

    /// Applies `decision_type` to every id in one step. All ids are validated
    /// before anything is written, so a bad id leaves the store untouched.
    pub fn batch_decision<'a, I>(
        &mut self,
        issue_ids: I,
        decision_type: DecisionType,
    ) -> Result<usize, DecisionError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        if decision_type == DecisionType::Modified {
            return Err(DecisionError::InvalidBatchDecision);
        }
        let ids: BTreeSet<&str> = issue_ids.into_iter().collect();
        if ids.is_empty() {
            return Err(DecisionError::EmptyBatch);
        }
        for id in &ids {
            self.ensure_known(id)?;
        }
        for id in &ids {
            let draft = DecisionDraft { decision_type: Some(decision_type), ..DecisionDraft::default() };
            self.entries.insert((*id).to_owned(), Decision::from_draft(draft));
        }
        Ok(ids.len())
    }

    pub fn get(&self, issue_id: &str) -> Option<&Decision> {
        self.entries.get(issue_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Decision)> {
        self.entries.iter().map(|(id, d)| (id.as_str(), d))
    }

    pub fn count_of(&self, decision_type: DecisionType) -> usize {
        self.entries.values().filter(|d| d.decision_type == decision_type).count()
    }

    /// Flattens the map into the batch array sent on save, ordered by id.
    pub fn to_payloads(&self) -> Vec<DecisionPayload> {
        self.entries
            .iter()
            .map(|(id, decision)| DecisionPayload { issue_id: id.clone(), decision: decision.clone() })
            .collect()
    }

    /// Drops entries the server has acknowledged. An entry is only removed if
    /// it is still identical to what was submitted, so decisions made while
    /// the save was in flight survive.
    pub fn acknowledge(&mut self, submitted: &[DecisionPayload]) -> usize {
        let mut removed = 0;
        for payload in submitted {
            if self.entries.get(&payload.issue_id) == Some(&payload.decision) {
                self.entries.remove(&payload.issue_id);
                removed += 1;
            }
        }
        removed
    }

    /// Replaces the known id set after a refresh and drops decisions for
    /// issues that no longer exist. Returns the dropped ids.
    pub fn reconcile<I, S>(&mut self, issue_ids: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.known = issue_ids.into_iter().map(Into::into).collect();
        let stale: Vec<String> =
            self.entries.keys().filter(|id| !self.known.contains(*id)).cloned().collect();
        for id in &stale {
            self.entries.remove(id);
        }
        stale
    }

    fn ensure_known(&self, issue_id: &str) -> Result<(), DecisionError> {
        if self.known.contains(issue_id) {
            Ok(())
        } else {
            Err(DecisionError::UnknownIssue(issue_id.to_owned()))
        }
    }
}
