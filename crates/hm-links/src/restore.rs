//! Restoring links from a backup document

use crate::backup::{BackupDocument, LinkBackupEntry};
use crate::error::{LinkError, LinkResult};
use crate::link::Link;
use crate::network::{DeviceMap, Network};
use crate::reconcile::UpdatePlan;
use hm_core::{DeviceAddress, LinkFlags};
use tracing::{error, info, instrument, warn};

/// What happened to one backup entry
#[derive(Debug)]
pub enum EntryOutcome {
    /// Link existed; its paramset was reconciled
    Updated(UpdatePlan),
    /// Link was missing and was created (`plan` is `None` in dry-run)
    Created {
        link: String,
        plan: Option<UpdatePlan>,
    },
    /// Link existed and was flagged for deletion
    Deleted { link: String, dry_run: bool },
    /// Flagged for deletion but not present on the network
    NothingToDelete { link: String },
    /// Entry could not be matched against the network or the document
    Skipped { reason: String },
    /// A remote call or a structural check failed for this entry
    Failed { link: String, error: LinkError },
}

impl EntryOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, EntryOutcome::Failed { .. })
    }
}

/// Outcomes of a restore, in backup order
#[derive(Debug, Default)]
pub struct RestoreReport {
    pub dry_run: bool,
    pub outcomes: Vec<EntryOutcome>,
}

impl RestoreReport {
    pub fn failures(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_failure()).count()
    }

    pub fn skipped(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, EntryOutcome::Skipped { .. }))
            .count()
    }

    /// Plans of updated and created links
    pub fn plans(&self) -> impl Iterator<Item = &UpdatePlan> {
        self.outcomes.iter().filter_map(|o| match o {
            EntryOutcome::Updated(plan) => Some(plan),
            EntryOutcome::Created { plan, .. } => plan.as_ref(),
            _ => None,
        })
    }
}

fn parse_address(raw: &str) -> Option<DeviceAddress> {
    raw.parse().ok()
}

impl Network {
    /// Bring the network in line with `document`
    ///
    /// Devices and links are read once up front. Each entry is handled on
    /// its own; a failing entry is reported and the rest still run.
    #[instrument(skip_all, fields(entries = document.links.len(), dry_run = dry_run))]
    pub async fn restore(
        &self,
        document: &BackupDocument,
        dry_run: bool,
    ) -> LinkResult<RestoreReport> {
        let devices = self.device_map().await?;
        let mut existing = self.links_with(&devices).await?;
        let mut report = RestoreReport {
            dry_run,
            outcomes: Vec::with_capacity(document.links.len()),
        };

        for entry in &document.links {
            let outcome = self
                .restore_entry(document, entry, &devices, &mut existing, dry_run)
                .await;
            if let EntryOutcome::Failed { link, error } = &outcome {
                error!(link = %link, error = %error, "Restoring link failed");
            }
            report.outcomes.push(outcome);
        }

        info!(
            entries = report.outcomes.len(),
            failures = report.failures(),
            skipped = report.skipped(),
            "Restore finished"
        );
        Ok(report)
    }

    async fn restore_entry(
        &self,
        document: &BackupDocument,
        entry: &LinkBackupEntry,
        devices: &DeviceMap,
        existing: &mut Vec<Link>,
        dry_run: bool,
    ) -> EntryOutcome {
        let sender = parse_address(&entry.sender).and_then(|a| devices.get(&a));
        let receiver = parse_address(&entry.receiver).and_then(|a| devices.get(&a));
        let (Some(sender), Some(receiver)) = (sender, receiver) else {
            warn!(
                sender = %entry.sender,
                receiver = %entry.receiver,
                "Device of backup entry not found in network, skipping"
            );
            return EntryOutcome::Skipped {
                reason: format!(
                    "device {} or {} not found in network",
                    entry.sender, entry.receiver
                ),
            };
        };

        let mut link = Link::new(sender.clone(), receiver.clone(), None, LinkFlags::empty());
        let position = existing.iter().position(|l| *l == link);
        let label = link.to_string();

        let Some(paramset) = document.paramset_of(entry) else {
            error!(
                link = %label,
                psetid = %entry.psetid,
                "Paramset id not found in backup"
            );
            return EntryOutcome::Skipped {
                reason: format!("paramset id {} not found in backup", entry.psetid),
            };
        };

        match (position, entry.delete) {
            (Some(idx), true) => match self.delete_link(&existing[idx], dry_run).await {
                Ok(()) => {
                    existing.remove(idx);
                    EntryOutcome::Deleted {
                        link: label,
                        dry_run,
                    }
                }
                Err(error) => EntryOutcome::Failed { link: label, error },
            },
            (Some(idx), false) => match self.reconcile(&mut existing[idx], paramset, dry_run).await
            {
                Ok(plan) => EntryOutcome::Updated(plan),
                Err(error) => EntryOutcome::Failed { link: label, error },
            },
            (None, true) => {
                info!(link = %label, "Link to delete not found in network, nothing to do");
                EntryOutcome::NothingToDelete { link: label }
            }
            (None, false) => match self.add_link(&mut link, paramset, dry_run).await {
                Ok(plan) => {
                    if dry_run {
                        link.set_cached_paramset(paramset.clone());
                    }
                    existing.push(link);
                    EntryOutcome::Created { link: label, plan }
                }
                Err(error) => EntryOutcome::Failed { link: label, error },
            },
        }
    }
}
