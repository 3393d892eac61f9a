//! Model of the resume-analysis JSON returned by the language model, and its conversion
//! into replacement requests.

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::Result;
use crate::ir::ReplacementRequest;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalysisResult {
    #[serde(deserialize_with = "score")]
    pub ats_score: f64,
    #[serde(deserialize_with = "score")]
    pub keyword_score: f64,
    #[serde(deserialize_with = "score")]
    pub format_score: f64,
    pub missing_keywords: Vec<String>,
    pub suggested_lines: Vec<SuggestedLine>,
    pub insert_positions: Vec<InsertPosition>,
    pub replacements: Vec<Replacement>,
    pub recommendations: Recommendations,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuggestedLine {
    pub content: String,
    pub section: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InsertPosition {
    pub content: String,
    pub style: String,
    pub section: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Replacement {
    pub target: String,
    pub replacement: String,
    pub section: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Recommendations {
    pub format_improvements: Vec<String>,
    pub keyword_optimization: Vec<String>,
}

fn score<'de, D: Deserializer<'de>>(de: D) -> std::result::Result<f64, D::Error> {
    let v = Option::<f64>::deserialize(de)?.unwrap_or(0.0);
    Ok(if v.is_nan() { 0.0 } else { v.clamp(0.0, 100.0) })
}

impl AnalysisResult {
    /// One request per replacement, ids `replacement-<i>` in response order.
    pub fn replacement_requests(&self) -> Vec<ReplacementRequest> {
        self.replacements
            .iter()
            .enumerate()
            .map(|(i, r)| {
                ReplacementRequest::new(r.target.clone(), r.replacement.clone(), r.section.clone())
                    .with_id(format!("replacement-{i}"))
            })
            .collect()
    }
}

/// Parse a model response. Prose or code fences before the first `{` are skipped, and
/// anything after the closing brace is ignored.
pub fn parse_analysis(text: &str) -> Result<AnalysisResult> {
    let start = text.find('{').unwrap_or(0);
    let mut de = serde_json::Deserializer::from_str(&text[start..]);
    Ok(AnalysisResult::deserialize(&mut de)?)
}
