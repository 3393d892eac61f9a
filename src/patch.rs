use std::collections::HashMap;

use tracing::{debug, info};

use crate::config::PatcherConfig;
use crate::docx::extract::flatten_text;
use crate::docx::package::DocxPackage;
use crate::docx::xml::XmlPart;
use crate::error::{PatchError, Result};
use crate::ir::{ReplacementRequest, Strategy};
use crate::resolve::Resolver;
use crate::sections::{SectionIndex, SectionIndexer};
use crate::textutil::with_name_suffix;

pub const OPTIMIZED_SUFFIX: &str = "_optimized";

/// A container opened for editing its main document part.
pub struct MainDocument {
    pub package: DocxPackage,
    pub part_name: String,
    pub xml: String,
    /// Flattened visible text, one line per paragraph.
    pub text: String,
}

impl MainDocument {
    pub fn open(container: &[u8], part_name: &str) -> Result<Self> {
        let package = DocxPackage::from_bytes(container).map_err(PatchError::Container)?;
        let entry = package
            .entry(part_name)
            .ok_or_else(|| PatchError::MissingPart(part_name.to_string()))?;
        let xml = String::from_utf8(entry.data.clone()).map_err(|_| PatchError::Encoding {
            part: part_name.to_string(),
        })?;
        let part = XmlPart::parse(part_name, &xml).map_err(|reason| PatchError::Xml {
            part: part_name.to_string(),
            reason,
        })?;
        let text = flatten_text(&part);
        Ok(Self {
            package,
            part_name: part_name.to_string(),
            xml,
            text,
        })
    }

    /// New container bytes with the main part replaced by `xml`; other entries pass through.
    pub fn to_bytes_with(&self, xml: &str) -> Result<Vec<u8>> {
        let mut replacements: HashMap<String, Vec<u8>> = HashMap::new();
        replacements.insert(self.part_name.clone(), xml.as_bytes().to_vec());
        self.package
            .to_bytes_with_replacements(&replacements)
            .map_err(PatchError::Container)
    }
}

#[derive(Clone, Debug)]
pub struct PatchOutcome {
    pub container: Vec<u8>,
    /// One flag per input request, in input order.
    pub applied: Vec<bool>,
    /// The input requests with `applied` filled in.
    pub requests: Vec<ReplacementRequest>,
    pub strategies: Vec<Option<Strategy>>,
    /// Sections detected in the document before any edit.
    pub sections: SectionIndex,
}

impl PatchOutcome {
    pub fn applied_count(&self) -> usize {
        self.applied.iter().filter(|a| **a).count()
    }

    pub fn summary(&self) -> String {
        format!(
            "Applied {} of {} suggestions",
            self.applied_count(),
            self.applied.len()
        )
    }
}

pub struct DocumentPatcher {
    cfg: PatcherConfig,
    resolver: Resolver,
    indexer: SectionIndexer,
}

impl DocumentPatcher {
    pub fn new(cfg: PatcherConfig) -> Result<Self> {
        cfg.validate().map_err(PatchError::Config)?;
        let resolver = Resolver::from_config(&cfg);
        let indexer = SectionIndexer::new(&cfg.sections);
        Ok(Self {
            cfg,
            resolver,
            indexer,
        })
    }

    /// Apply `requests` in order to the main part of `container`. Each request sees the
    /// edits of the ones before it. The input buffer is never modified.
    pub fn apply_all(&self, container: &[u8], requests: &[ReplacementRequest]) -> Result<PatchOutcome> {
        let doc = MainDocument::open(container, &self.cfg.package.main_part)?;
        let sections = self.indexer.index(&doc.text);
        debug!(sections = sections.len(), requests = requests.len(), "patch pass start");

        let mut xml = doc.xml.clone();
        let mut out_requests: Vec<ReplacementRequest> = Vec::with_capacity(requests.len());
        let mut strategies: Vec<Option<Strategy>> = Vec::with_capacity(requests.len());
        for request in requests {
            let resolution = self.resolver.resolve(&xml, request, &sections, &doc.text);
            let mut updated = request.clone();
            updated.applied = resolution.applied();
            if updated.applied {
                xml = resolution.xml;
            }
            strategies.push(resolution.strategy);
            out_requests.push(updated);
        }

        let container = doc.to_bytes_with(&xml)?;
        let outcome = PatchOutcome {
            container,
            applied: out_requests.iter().map(|r| r.applied).collect(),
            requests: out_requests,
            strategies,
            sections,
        };
        info!("{}", outcome.summary());
        Ok(outcome)
    }
}

/// Patch with the default configuration.
pub fn apply_all(container: &[u8], requests: &[ReplacementRequest]) -> Result<PatchOutcome> {
    DocumentPatcher::new(PatcherConfig::default())?.apply_all(container, requests)
}

/// `resume.docx` -> `resume_optimized.docx`.
pub fn optimized_file_name(file_name: &str) -> String {
    with_name_suffix(file_name, OPTIMIZED_SUFFIX)
}
