//! Bundled remediation catalog.
//!
//! Maps each stateful-pattern category to the steps that remove it. The
//! catalog ships inside the binary and is parsed once on first use.

use std::fmt::Write as _;
use std::sync::OnceLock;

use serde::Deserialize;

use crate::types::RecommendedAction;

const BUNDLED_CATALOG: &str = include_str!("../data/remediation-actions.json");

/// Parsed remediation catalog.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RemediationCatalog {
    #[serde(default)]
    pub actions: Vec<RecommendedAction>,
}

/// Outcome of a category lookup. A miss is informational, not an error.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Lookup<'a> {
    Found(&'a RecommendedAction),
    NotFound,
}

impl RemediationCatalog {
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// Case-insensitive exact match on the category name.
    pub fn lookup(&self, category: &str) -> Lookup<'_> {
        let wanted = category.to_lowercase();
        self.actions
            .iter()
            .find(|a| a.category.to_lowercase() == wanted)
            .map_or(Lookup::NotFound, Lookup::Found)
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.actions.iter().map(|a| a.category.as_str())
    }

    /// Render guidance for `category`, or the list of known categories when
    /// nothing matches.
    pub fn explain(&self, category: &str) -> String {
        match self.lookup(category) {
            Lookup::Found(entry) => format_remediation(entry),
            Lookup::NotFound => {
                let known: Vec<String> = self.categories().map(|c| format!("- {c}")).collect();
                format!(
                    "No remediation guidance found for category: {category}\n\n\
                     Available categories:\n{}",
                    known.join("\n")
                )
            }
        }
    }
}

/// The process-wide catalog, parsed on first access.
pub fn catalog() -> &'static RemediationCatalog {
    static CATALOG: OnceLock<RemediationCatalog> = OnceLock::new();
    CATALOG.get_or_init(|| {
        RemediationCatalog::from_json(BUNDLED_CATALOG).unwrap_or_else(|e| {
            tracing::error!("bundled remediation catalog is invalid: {e}");
            RemediationCatalog::default()
        })
    })
}

fn format_remediation(entry: &RecommendedAction) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# Remediation: {}\n", entry.category);
    let _ = writeln!(out, "**Effort**: {} points\n", entry.effort_weight);
    out.push_str("## Actions Required:\n\n");
    let steps: Vec<String> = entry
        .sub_actions
        .iter()
        .enumerate()
        .map(|(idx, sub)| {
            let mut step = format!("{}. **{}** ({} points)", idx + 1, sub.action, sub.effort);
            if let Some(description) = sub.description.as_deref().filter(|d| !d.is_empty()) {
                let _ = write!(step, "\n   {description}");
            }
            step
        })
        .collect();
    out.push_str(&steps.join("\n\n"));
    out
}
