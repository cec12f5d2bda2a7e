//! # Document Requirement Resolver
//!
//! Tracks which documents a shipment needs from each party and which have
//! been supplied. Requirements arrive in numbered cycles: cycle 1 is the
//! catalog set opened at HS approval, and each additional-documents hold
//! opens another. Cycles accumulate; nothing is replaced.
//!
//! A cycle accepts submissions and withdrawals only while the shipment is
//! still in the status that opened it.

use std::collections::HashSet;

use clearance_core::{DocumentName, DocumentParty, Timestamp};
use clearance_ports::DocumentReference;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::status::ShipmentStatus;

/// One line of a requirement batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRequest {
    /// Document name; unique within a cycle.
    pub name: DocumentName,
    /// Who must supply it.
    pub requested_for: DocumentParty,
    /// Free-text guidance for the party.
    #[serde(default)]
    pub notes: Option<String>,
}

/// A requested document. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRequirement {
    /// Document name.
    pub name: DocumentName,
    /// Who must supply it.
    pub requested_for: DocumentParty,
    /// Free-text guidance.
    pub notes: Option<String>,
    /// Cycle the requirement belongs to.
    pub cycle: u32,
    /// When it was requested.
    pub requested_at: Timestamp,
}

/// An uploaded document fulfilling a requirement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSubmission {
    /// Document name.
    pub name: DocumentName,
    /// Cycle of the fulfilled requirement.
    pub cycle: u32,
    /// Storage reference.
    pub reference: DocumentReference,
    /// Upload time.
    pub submitted_at: Timestamp,
    /// Session subject that uploaded it.
    pub submitted_by: String,
}

/// A batch window for requirements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentCycle {
    /// 1-based cycle number.
    pub number: u32,
    /// Status in which the cycle accepts uploads.
    pub opened_in: ShipmentStatus,
    /// When the cycle was opened.
    pub opened_at: Timestamp,
}

/// Document resolver failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DocumentError {
    /// No requirement with this name exists.
    #[error("no requirement for document {name:?}")]
    UnknownDocument {
        /// Requested name.
        name: String,
    },

    /// The requirement already has a submission.
    #[error("document {name:?} has already been submitted")]
    AlreadySubmitted {
        /// Document name.
        name: String,
    },

    /// Nothing has been submitted under this name.
    #[error("document {name:?} has not been submitted")]
    NotSubmitted {
        /// Document name.
        name: String,
    },

    /// The shipment has moved past the status that opened the cycle.
    #[error("document {name:?} can no longer be withdrawn")]
    WithdrawalClosed {
        /// Document name.
        name: String,
    },

    /// The cycle no longer accepts uploads.
    #[error("documents cycle {cycle} is closed")]
    CycleClosed {
        /// Cycle number.
        cycle: u32,
    },

    /// The current cycle already has its batch.
    #[error("requirements for documents cycle {cycle} were already created")]
    RequirementsAlreadyCreated {
        /// Cycle number.
        cycle: u32,
    },

    /// No cycle is open.
    #[error("no documents cycle is open")]
    NoOpenCycle,

    /// The batch is empty or repeats a name.
    #[error("invalid requirement batch: {reason}")]
    InvalidBatch {
        /// What is wrong.
        reason: String,
    },

    /// The caller is not the party the document was requested from.
    #[error("document {name:?} was requested from the {requested_for}")]
    WrongParty {
        /// Document name.
        name: String,
        /// The party that must supply it.
        requested_for: DocumentParty,
    },
}

/// Requirements, submissions and cycles of one shipment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentLedger {
    cycles: Vec<DocumentCycle>,
    requirements: Vec<DocumentRequirement>,
    submissions: Vec<DocumentSubmission>,
}

impl DocumentLedger {
    /// Open the next cycle, accepting uploads while the shipment is in `status`.
    pub fn open_cycle(&mut self, status: ShipmentStatus, at: Timestamp) -> u32 {
        let number = self.cycles.last().map_or(1, |c| c.number + 1);
        self.cycles.push(DocumentCycle {
            number,
            opened_in: status,
            opened_at: at,
        });
        number
    }

    /// The most recently opened cycle.
    pub fn current_cycle(&self) -> Option<&DocumentCycle> {
        self.cycles.last()
    }

    /// All cycles, oldest first.
    pub fn cycles(&self) -> &[DocumentCycle] {
        &self.cycles
    }

    /// All requirements, oldest first.
    pub fn requirements(&self) -> &[DocumentRequirement] {
        &self.requirements
    }

    /// All live submissions.
    pub fn submissions(&self) -> &[DocumentSubmission] {
        &self.submissions
    }

    /// Add the batch for the current cycle. Callable once per cycle.
    pub fn create_requirements(
        &mut self,
        requests: Vec<DocumentRequest>,
        at: Timestamp,
    ) -> Result<usize, DocumentError> {
        let cycle = self.current_cycle().ok_or(DocumentError::NoOpenCycle)?.number;
        if self.requirements.iter().any(|r| r.cycle == cycle) {
            return Err(DocumentError::RequirementsAlreadyCreated { cycle });
        }
        if requests.is_empty() {
            return Err(DocumentError::InvalidBatch {
                reason: "at least one document is required".to_string(),
            });
        }
        let mut names = HashSet::new();
        for request in &requests {
            if !names.insert(request.name.as_str().to_ascii_lowercase()) {
                return Err(DocumentError::InvalidBatch {
                    reason: format!("{:?} is listed more than once", request.name.as_str()),
                });
            }
        }
        let count = requests.len();
        self.requirements
            .extend(requests.into_iter().map(|r| DocumentRequirement {
                name: r.name,
                requested_for: r.requested_for,
                notes: r.notes.filter(|n| !n.trim().is_empty()),
                cycle,
                requested_at: at,
            }));
        Ok(count)
    }

    fn submission_for(&self, requirement: &DocumentRequirement) -> Option<&DocumentSubmission> {
        self.submissions
            .iter()
            .find(|s| s.cycle == requirement.cycle && s.name == requirement.name)
    }

    fn is_fulfilled(&self, requirement: &DocumentRequirement) -> bool {
        self.submission_for(requirement).is_some()
    }

    /// Whether every requirement for `party` has a submission.
    pub fn is_satisfied(&self, party: DocumentParty) -> bool {
        self.requirements
            .iter()
            .filter(|r| r.requested_for == party)
            .all(|r| self.is_fulfilled(r))
    }

    /// Whether every requirement has a submission.
    pub fn all_satisfied(&self) -> bool {
        self.requirements.iter().all(|r| self.is_fulfilled(r))
    }

    /// Whether the current cycle has requirements and all are fulfilled.
    pub fn cycle_satisfied(&self) -> bool {
        let Some(cycle) = self.current_cycle() else {
            return false;
        };
        let mut in_cycle = self
            .requirements
            .iter()
            .filter(|r| r.cycle == cycle.number)
            .peekable();
        in_cycle.peek().is_some() && in_cycle.all(|r| self.is_fulfilled(r))
    }

    /// Requirements without a submission.
    pub fn outstanding(&self) -> Vec<&DocumentRequirement> {
        self.requirements
            .iter()
            .filter(|r| !self.is_fulfilled(r))
            .collect()
    }

    /// Names of unfulfilled requirements, for error messages.
    pub fn outstanding_names(&self) -> String {
        self.outstanding()
            .iter()
            .map(|r| r.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn latest_requirement(&self, name: &DocumentName) -> Option<&DocumentRequirement> {
        self.requirements.iter().rev().find(|r| &r.name == name)
    }

    /// The live submission for the latest requirement named `name`.
    pub fn latest_submission(&self, name: &DocumentName) -> Option<&DocumentSubmission> {
        self.latest_requirement(name)
            .and_then(|r| self.submission_for(r))
    }

    fn ensure_open(&self, requirement: &DocumentRequirement, status: ShipmentStatus) -> bool {
        self.current_cycle()
            .is_some_and(|c| c.number == requirement.cycle && c.opened_in == status)
    }

    /// Check that `party` may submit `name` now.
    pub fn check_submit(
        &self,
        status: ShipmentStatus,
        party: DocumentParty,
        name: &DocumentName,
    ) -> Result<(), DocumentError> {
        let requirement =
            self.latest_requirement(name)
                .ok_or_else(|| DocumentError::UnknownDocument {
                    name: name.as_str().to_string(),
                })?;
        if requirement.requested_for != party {
            return Err(DocumentError::WrongParty {
                name: name.as_str().to_string(),
                requested_for: requirement.requested_for,
            });
        }
        if self.is_fulfilled(requirement) {
            return Err(DocumentError::AlreadySubmitted {
                name: name.as_str().to_string(),
            });
        }
        if !self.ensure_open(requirement, status) {
            return Err(DocumentError::CycleClosed {
                cycle: requirement.cycle,
            });
        }
        Ok(())
    }

    /// Record an upload for the latest requirement named `name`.
    pub fn submit(
        &mut self,
        status: ShipmentStatus,
        party: DocumentParty,
        name: &DocumentName,
        reference: DocumentReference,
        submitted_by: &str,
        at: Timestamp,
    ) -> Result<&DocumentSubmission, DocumentError> {
        self.check_submit(status, party, name)?;
        let cycle = self
            .latest_requirement(name)
            .map(|r| r.cycle)
            .ok_or_else(|| DocumentError::UnknownDocument {
                name: name.as_str().to_string(),
            })?;
        self.submissions.push(DocumentSubmission {
            name: name.clone(),
            cycle,
            reference,
            submitted_at: at,
            submitted_by: submitted_by.to_string(),
        });
        let index = self.submissions.len() - 1;
        Ok(&self.submissions[index])
    }

    /// Remove the submission for `name` while its cycle is still open.
    ///
    /// `party` is `None` for agency-initiated withdrawals.
    pub fn withdraw(
        &mut self,
        status: ShipmentStatus,
        party: Option<DocumentParty>,
        name: &DocumentName,
    ) -> Result<DocumentSubmission, DocumentError> {
        let requirement = self
            .latest_requirement(name)
            .cloned()
            .ok_or_else(|| DocumentError::UnknownDocument {
                name: name.as_str().to_string(),
            })?;
        if let Some(party) = party {
            if requirement.requested_for != party {
                return Err(DocumentError::WrongParty {
                    name: name.as_str().to_string(),
                    requested_for: requirement.requested_for,
                });
            }
        }
        let position = self
            .submissions
            .iter()
            .position(|s| s.cycle == requirement.cycle && s.name == requirement.name)
            .ok_or_else(|| DocumentError::NotSubmitted {
                name: name.as_str().to_string(),
            })?;
        if !self.ensure_open(&requirement, status) {
            return Err(DocumentError::WithdrawalClosed {
                name: name.as_str().to_string(),
            });
        }
        Ok(self.submissions.remove(position))
    }
}
