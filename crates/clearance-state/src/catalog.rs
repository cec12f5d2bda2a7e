//! # Document Catalog
//!
//! The documents requested when the agency approves classification, keyed
//! by the destination HS chapter (first two digits). Every shipment gets
//! the default set; some chapters add to it.

use std::collections::BTreeMap;

use clearance_core::{DocumentName, DocumentParty, HsCode};
use serde::{Deserialize, Serialize};

use crate::documents::DocumentRequest;

/// Source of the initial documents cycle.
pub trait DocumentCatalog: Send + Sync {
    /// Documents to request for goods classified as `destination_hs_code`.
    fn documents_for(&self, destination_hs_code: &HsCode) -> Vec<DocumentRequest>;
}

/// One catalog line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Document name.
    pub name: DocumentName,
    /// Who supplies it.
    #[serde(default = "default_party")]
    pub requested_for: DocumentParty,
    /// Guidance shown to the party.
    #[serde(default)]
    pub notes: Option<String>,
}

fn default_party() -> DocumentParty {
    DocumentParty::Sender
}

impl CatalogEntry {
    fn sender(name: &str, notes: Option<&str>) -> Option<Self> {
        Some(Self {
            name: DocumentName::new(name).ok()?,
            requested_for: DocumentParty::Sender,
            notes: notes.map(str::to_string),
        })
    }

    fn to_request(&self) -> DocumentRequest {
        DocumentRequest {
            name: self.name.clone(),
            requested_for: self.requested_for,
            notes: self.notes.clone(),
        }
    }
}

/// Configurable catalog: a default set plus per-chapter additions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StaticDocumentCatalog {
    /// Requested for every shipment.
    pub default: Vec<CatalogEntry>,
    /// Extra documents by two-digit HS chapter.
    pub chapters: BTreeMap<String, Vec<CatalogEntry>>,
}

impl Default for StaticDocumentCatalog {
    fn default() -> Self {
        let default = [
            ("Commercial Invoice", None),
            ("Packing List", None),
            ("Certificate of Origin", None),
        ]
        .into_iter()
        .filter_map(|(n, notes)| CatalogEntry::sender(n, notes))
        .collect();

        let mut chapters = BTreeMap::new();
        chapters.insert(
            "30".to_string(),
            CatalogEntry::sender("Drug Import Licence", Some("Issued by the destination drug regulator"))
                .into_iter()
                .collect(),
        );
        chapters.insert(
            "93".to_string(),
            CatalogEntry::sender("End User Certificate", None)
                .into_iter()
                .chain(CatalogEntry::sender("Arms Export Licence", None))
                .collect(),
        );
        chapters.insert(
            "85".to_string(),
            CatalogEntry::sender("Product Conformity Certificate", None)
                .into_iter()
                .collect(),
        );

        Self { default, chapters }
    }
}

impl StaticDocumentCatalog {
    /// Catalog with no chapter additions and no defaults.
    pub fn empty() -> Self {
        Self {
            default: Vec::new(),
            chapters: BTreeMap::new(),
        }
    }
}

impl DocumentCatalog for StaticDocumentCatalog {
    fn documents_for(&self, destination_hs_code: &HsCode) -> Vec<DocumentRequest> {
        let extras = self
            .chapters
            .get(destination_hs_code.chapter())
            .map(Vec::as_slice)
            .unwrap_or_default();
        let mut requests: Vec<DocumentRequest> = Vec::new();
        for entry in self.default.iter().chain(extras) {
            if !requests.iter().any(|r| r.name == entry.name) {
                requests.push(entry.to_request());
            }
        }
        requests
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(requests: &[DocumentRequest]) -> Vec<&str> {
        requests.iter().map(|r| r.name.as_str()).collect()
    }

    #[test]
    fn default_set_for_unlisted_chapter() {
        let catalog = StaticDocumentCatalog::default();
        let docs = catalog.documents_for(&HsCode::new("610910").unwrap());
        assert_eq!(
            names(&docs),
            vec!["Commercial Invoice", "Packing List", "Certificate of Origin"]
        );
        assert!(docs.iter().all(|d| d.requested_for == DocumentParty::Sender));
    }

    #[test]
    fn chapter_adds_documents() {
        let catalog = StaticDocumentCatalog::default();
        let docs = catalog.documents_for(&HsCode::new("3004.90").unwrap());
        assert_eq!(docs.len(), 4);
        assert_eq!(docs[3].name.as_str(), "Drug Import Licence");
    }

    #[test]
    fn duplicates_collapse() {
        let mut catalog = StaticDocumentCatalog::default();
        catalog.chapters.insert(
            "61".to_string(),
            CatalogEntry::sender("Packing List", None).into_iter().collect(),
        );
        let docs = catalog.documents_for(&HsCode::new("610910").unwrap());
        assert_eq!(docs.len(), 3);
    }

    #[test]
    fn loads_from_yaml() {
        let yaml = r#"
default:
  - name: Commercial Invoice
chapters:
  "71":
    - name: Hallmark Certificate
      requested_for: receiver
      notes: Assay office stamp
"#;
        let catalog: StaticDocumentCatalog = serde_yaml::from_str(yaml).unwrap();
        let docs = catalog.documents_for(&HsCode::new("711319").unwrap());
        assert_eq!(names(&docs), vec!["Commercial Invoice", "Hallmark Certificate"]);
        assert_eq!(docs[1].requested_for, DocumentParty::Receiver);
    }
}
