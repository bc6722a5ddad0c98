//! Link paramset reconciliation
//!
//! Compares a proposed (backed up) paramset with the live paramset of a link,
//! validates every changed key and builds an [`UpdatePlan`]. The plan is only
//! pushed to the network when the caller opts out of dry-run.

use crate::error::{LinkError, LinkResult};
use crate::link::Link;
use crate::network::Network;
use crate::validator::{decide, Decision};
use hm_core::{paramsets, ParamValue, Paramset, ParamsetDescription};
use std::collections::BTreeSet;
use tracing::{info, instrument};

/// Validation result for one changed key
#[derive(Debug, Clone, PartialEq)]
pub struct KeyDecision {
    pub key: String,
    pub old: ParamValue,
    pub new: ParamValue,
    pub decision: Decision,
}

/// What reconciling one link did, or would do
#[derive(Debug, Clone, PartialEq)]
pub struct UpdatePlan {
    /// `SENDER -> RECEIVER` of the link
    pub link: String,
    /// One entry per changed key, in key order
    pub decisions: Vec<KeyDecision>,
    /// Live paramset with all accepted keys applied
    pub merged: Paramset,
    pub dry_run: bool,
    /// Whether `merged` was written to the network
    pub applied: bool,
}

impl UpdatePlan {
    /// Whether any key was accepted
    pub fn changed(&self) -> bool {
        self.decisions.iter().any(|d| d.decision.is_accept())
    }

    pub fn accepted(&self) -> impl Iterator<Item = &KeyDecision> {
        self.decisions.iter().filter(|d| d.decision.is_accept())
    }

    pub fn rejected(&self) -> impl Iterator<Item = &KeyDecision> {
        self.decisions.iter().filter(|d| d.decision.is_reject())
    }

    /// Decision for a single key, if that key changed
    pub fn decision(&self, key: &str) -> Option<&Decision> {
        self.decisions
            .iter()
            .find(|d| d.key == key)
            .map(|d| &d.decision)
    }
}

/// Keys whose value differs, after checking that both paramsets have the
/// same key set and that every differing value keeps its wire type
pub fn changed_keys(existing: &Paramset, proposed: &Paramset) -> LinkResult<Vec<String>> {
    let existing_keys: BTreeSet<&String> = existing.keys().collect();
    let proposed_keys: BTreeSet<&String> = proposed.keys().collect();
    let uncommon: Vec<&str> = existing_keys
        .symmetric_difference(&proposed_keys)
        .map(|k| k.as_str())
        .collect();
    if !uncommon.is_empty() {
        return Err(LinkError::structural(format!(
            "keys {:?} are not present in both the device and the paramset to put",
            uncommon
        )));
    }

    let mut changed = Vec::new();
    for (key, new) in proposed {
        let old = &existing[key];
        if old == new {
            continue;
        }
        if !old.same_type(new) {
            return Err(LinkError::structural(format!(
                "type of {} differs: live {} ({}), proposed {} ({})",
                key,
                old,
                old.type_name(),
                new,
                new.type_name()
            )));
        }
        changed.push(key.clone());
    }
    Ok(changed)
}

/// Validate `changed` keys and merge the accepted ones into `existing`
pub fn plan_changes(
    existing: &Paramset,
    proposed: &Paramset,
    changed: &[String],
    description: &ParamsetDescription,
) -> (Vec<KeyDecision>, Paramset) {
    let mut merged = existing.clone();
    let mut decisions = Vec::with_capacity(changed.len());

    for key in changed {
        let old = &existing[key];
        let new = &proposed[key];
        let decision = decide(key, old, new, description.get(key));
        if decision.is_accept() {
            merged.insert(key.clone(), new.clone());
        }
        decisions.push(KeyDecision {
            key: key.clone(),
            old: old.clone(),
            new: new.clone(),
            decision,
        });
    }

    (decisions, merged)
}

impl Network {
    /// Reconcile the receiver paramset of `link` with `proposed`
    ///
    /// Structural problems fail before anything is written. Rejected keys
    /// keep their live value and do not stop the accepted ones.
    #[instrument(skip_all, fields(link = %link, dry_run = dry_run))]
    pub async fn reconcile(
        &self,
        link: &mut Link,
        proposed: &Paramset,
        dry_run: bool,
    ) -> LinkResult<UpdatePlan> {
        let existing = link.paramset(self.rpc(), false).await?.clone();
        let changed = changed_keys(&existing, proposed)?;

        if changed.is_empty() {
            return Ok(UpdatePlan {
                link: link.to_string(),
                decisions: Vec::new(),
                merged: existing,
                dry_run,
                applied: false,
            });
        }

        if dry_run {
            info!("------------ DRY RUN ---------------");
        }
        info!("Updating paramset of link {}", link);

        let description = self
            .descriptors()
            .descriptors(self.rpc(), link.receiver(), paramsets::LINK, false)
            .await?;
        let (decisions, merged) = plan_changes(&existing, proposed, &changed, &description);

        let mut plan = UpdatePlan {
            link: link.to_string(),
            decisions,
            merged,
            dry_run,
            applied: false,
        };

        if plan.changed() && !dry_run {
            self.rpc()
                .put_paramset(
                    link.receiver().address(),
                    link.sender().address().as_str(),
                    &plan.merged,
                )
                .await?;
            link.set_cached_paramset(plan.merged.clone());
            plan.applied = true;
        }

        Ok(plan)
    }
}
