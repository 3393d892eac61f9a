use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};

use crate::docx::model::FontSpec;
use crate::ir::Strategy;

pub const DEFAULT_CONFIG_FILENAME: &str = "resume-docx-patcher.toml";
pub const MAIN_DOCUMENT_PART: &str = "word/document.xml";

#[derive(Clone, Debug, Deserialize, Serialize, Default)]
pub struct PatcherConfig {
    #[serde(default)]
    pub resolver: ResolverConfig,
    #[serde(default)]
    pub sections: SectionsConfig,
    #[serde(default)]
    pub synth: SynthConfig,
    #[serde(default)]
    pub package: PackageConfig,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// A section line must score strictly above this to be rewritten by the fuzzy strategy.
    pub similarity_threshold: f64,
    /// Maximum relative length difference accepted by the length strategy (exclusive).
    pub length_tolerance: f64,
    /// How many leading characters of a section line are used to locate its paragraph.
    pub line_prefix_chars: usize,
    /// Strategies to try, in order.
    pub strategies: Vec<Strategy>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.7,
            length_tolerance: 0.2,
            line_prefix_chars: 50,
            strategies: Strategy::CASCADE.to_vec(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct SectionsConfig {
    /// Lines with more words than this are never treated as headings.
    pub max_heading_words: usize,
    /// Additional `A|B|C` heading groups, tried after the built-in ones.
    pub extra_heading_patterns: Vec<String>,
}

impl Default for SectionsConfig {
    fn default() -> Self {
        Self {
            max_heading_words: 5,
            extra_heading_patterns: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct SynthConfig {
    pub default_font: String,
    pub default_size_half_points: u32,
}

impl Default for SynthConfig {
    fn default() -> Self {
        let font = FontSpec::default();
        Self {
            default_font: font.family,
            default_size_half_points: font.size_half_points,
        }
    }
}

impl SynthConfig {
    pub fn font(&self) -> FontSpec {
        FontSpec {
            family: self.default_font.clone(),
            size_half_points: self.default_size_half_points,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct PackageConfig {
    pub main_part: String,
}

impl Default for PackageConfig {
    fn default() -> Self {
        Self {
            main_part: MAIN_DOCUMENT_PART.to_string(),
        }
    }
}

impl PatcherConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        let r = &self.resolver;
        if !(0.0..=1.0).contains(&r.similarity_threshold) {
            return Err(anyhow!(
                "resolver.similarity_threshold must be within [0, 1], got {}",
                r.similarity_threshold
            ));
        }
        if !(r.length_tolerance > 0.0) {
            return Err(anyhow!(
                "resolver.length_tolerance must be positive, got {}",
                r.length_tolerance
            ));
        }
        if r.line_prefix_chars == 0 {
            return Err(anyhow!("resolver.line_prefix_chars must be at least 1"));
        }
        if self.sections.max_heading_words == 0 {
            return Err(anyhow!("sections.max_heading_words must be at least 1"));
        }
        if self.synth.default_font.trim().is_empty() || self.synth.default_size_half_points == 0 {
            return Err(anyhow!("synth defaults need a font family and a non-zero size"));
        }
        if self.package.main_part.trim().is_empty() {
            return Err(anyhow!("package.main_part must not be empty"));
        }
        Ok(())
    }
}

pub fn find_file_upwards(start_dir: &Path, filename: &str, max_levels: usize) -> Option<PathBuf> {
    let mut dir = start_dir;
    for _ in 0..=max_levels {
        let candidate = dir.join(filename);
        if candidate.exists() {
            return Some(candidate);
        }
        dir = dir.parent()?;
    }
    None
}

pub fn find_default_config(workdir: &Path, filename: &str) -> Option<PathBuf> {
    if let Ok(cwd) = std::env::current_dir() {
        if let Some(p) = find_file_upwards(&cwd, filename, 8) {
            return Some(p);
        }
    }
    find_file_upwards(workdir, filename, 8)
}

pub fn parse_config(text: &str) -> anyhow::Result<PatcherConfig> {
    let cfg: PatcherConfig = toml::from_str(text).context("parse config toml")?;
    cfg.validate()?;
    Ok(cfg)
}

pub fn load_config(path: &Path) -> anyhow::Result<PatcherConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("read config: {}", path.display()))?;
    parse_config(&text).with_context(|| format!("config: {}", path.display()))
}
