use crate::error::IngestError;
use crate::models::QueryIntent;
use regex::Regex;

/// Catalog-intent patterns, English and Spanish, tried in order.
const CATALOG_PATTERNS: [(&str, &str); 6] = [
    ("title", r"(?i)\b(?:titles?|t[ií]tulos?)\b"),
    ("author", r"(?i)\b(?:authors?|autor(?:es)?|autoras?)\b"),
    ("year", r"(?i)\b(?:years?|a[ñn]os?)\b"),
    ("papers", r"(?i)\b(?:papers?|art[ií]culos?|documentos?)\b"),
    ("list", r"(?i)\b(?:list|listar?|enumera(?:r)?)\b"),
    ("research", r"(?i)\b(?:research|investigaci[oó]n(?:es)?)\b"),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteDecision {
    pub intent: QueryIntent,
    pub matched: Option<&'static str>,
}

/// Decides whether a question is answered from the catalog or by semantic search.
pub struct MetadataRouter {
    patterns: Vec<(&'static str, Regex)>,
}

impl MetadataRouter {
    pub fn new() -> Result<Self, IngestError> {
        let patterns = CATALOG_PATTERNS
            .iter()
            .map(|(name, pattern)| Ok((*name, Regex::new(pattern)?)))
            .collect::<Result<Vec<_>, IngestError>>()?;
        Ok(Self { patterns })
    }

    pub fn route(&self, question: &str) -> RouteDecision {
        let matched = self
            .patterns
            .iter()
            .find(|(_, pattern)| pattern.is_match(question))
            .map(|(name, _)| *name);

        RouteDecision {
            intent: if matched.is_some() {
                QueryIntent::Catalog
            } else {
                QueryIntent::Content
            },
            matched,
        }
    }

    pub fn is_catalog_question(&self, question: &str) -> bool {
        self.route(question).intent == QueryIntent::Catalog
    }
}
