use serde::{Deserialize, Serialize};

/// One proposed edit: replace the visible text `target` (found in `section`) with
/// `replacement`. `applied` is set only by the patcher.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplacementRequest {
    #[serde(default)]
    pub target: String,
    #[serde(default)]
    pub replacement: String,
    #[serde(default)]
    pub section: String,
    #[serde(default)]
    pub applied: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl ReplacementRequest {
    pub fn new(
        target: impl Into<String>,
        replacement: impl Into<String>,
        section: impl Into<String>,
    ) -> Self {
        Self {
            target: target.into(),
            replacement: replacement.into(),
            section: section.into(),
            applied: false,
            id: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Target lives inside a single `<w:t>`; only those characters change.
    ExactRun,
    /// Target spans runs of one paragraph; that paragraph is rebuilt.
    CrossRun,
    /// A line of the claimed section is similar enough to the target.
    SectionFuzzy,
    /// A line of the claimed section has about the target's length.
    SectionLength,
}

impl Strategy {
    pub const CASCADE: [Strategy; 4] = [
        Strategy::ExactRun,
        Strategy::CrossRun,
        Strategy::SectionFuzzy,
        Strategy::SectionLength,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Strategy::ExactRun => "exact_run",
            Strategy::CrossRun => "cross_run",
            Strategy::SectionFuzzy => "section_fuzzy",
            Strategy::SectionLength => "section_length",
        }
    }
}

/// Result of resolving one request. On a miss `xml` is the input, byte for byte.
#[derive(Clone, Debug)]
pub struct Resolution {
    pub strategy: Option<Strategy>,
    pub xml: String,
}

impl Resolution {
    pub fn applied(&self) -> bool {
        self.strategy.is_some()
    }
}
