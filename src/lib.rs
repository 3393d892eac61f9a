//! In-place text substitution for resume `.docx` files: locate a span of visible text
//! inside the run structure of `word/document.xml`, replace it while keeping paragraph
//! styling, and write a fresh container.

pub mod config;
pub mod docx;
pub mod error;
pub mod ir;
pub mod oracle;
pub mod patch;
pub mod resolve;
pub mod sections;
pub mod similarity;
pub mod template;
pub mod textutil;

pub use config::{load_config, PatcherConfig};
pub use error::{PatchError, Result};
pub use ir::{ReplacementRequest, Resolution, Strategy};
pub use oracle::{parse_analysis, AnalysisResult};
pub use patch::{apply_all, optimized_file_name, DocumentPatcher, PatchOutcome};
pub use resolve::{apply_to_text, Resolver};
pub use sections::{SectionIndex, SectionIndexer, TitledSection};
pub use template::{bind, template_file_name, TemplateBinder, TemplateCatalog};
