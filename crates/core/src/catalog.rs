use crate::error::ConfigError;
use crate::ingest::discover_pdf_files;
use crate::models::{clean_metadata, Metadata};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use serde_with::{serde_as, DisplayFromStr, PickFirst};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

pub const EMPTY_CATALOG_MESSAGE: &str = "No papers found in the catalog.";

#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Paper {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde_as(as = "Option<PickFirst<(_, DisplayFromStr)>>")]
    pub year: Option<i64>,
    #[serde(default)]
    pub venue: Option<String>,
    #[serde(default)]
    pub doi: Option<String>,
    pub filename: String,
    #[serde(default)]
    pub section: Option<String>,
}

impl Paper {
    /// Bibliographic fields attached to every chunk of this paper.
    pub fn base_metadata(&self) -> Metadata {
        let raw = json!({
            "paper_id": self.id,
            "title": self.title,
            "authors": self.authors.join(", "),
            "year": self.year,
            "venue": self.venue.clone().unwrap_or_default(),
            "doi": self.doi.clone().unwrap_or_default(),
            "filename": self.filename,
            "section": self.section.clone().unwrap_or_default(),
        });
        match raw {
            Value::Object(map) => clean_metadata(map),
            _ => Metadata::new(),
        }
    }

    pub fn pdf_path(&self, papers_dir: &Path) -> PathBuf {
        papers_dir.join(&self.filename)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Catalog {
    pub papers: Vec<Paper>,
}

impl Catalog {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)
            .map_err(|error| ConfigError::CatalogMissing(format!("{}: {error}", path.display())))?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(raw).map_err(|error| ConfigError::CatalogMalformed(error.to_string()))
    }

    /// One `- title` line per paper, in catalog order.
    pub fn titles_listing(&self) -> String {
        if self.papers.is_empty() {
            return EMPTY_CATALOG_MESSAGE.to_string();
        }
        self.papers
            .iter()
            .map(|paper| format!("- {}", paper.title))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Compares the catalog against the PDFs actually present under `papers_dir`.
    pub fn audit(&self, papers_dir: &Path) -> CatalogAudit {
        let referenced: HashSet<PathBuf> = self
            .papers
            .iter()
            .map(|paper| paper.pdf_path(papers_dir))
            .collect();

        let missing_pdfs = self
            .papers
            .iter()
            .filter(|paper| !paper.pdf_path(papers_dir).is_file())
            .map(|paper| paper.filename.clone())
            .collect();

        let unreferenced_pdfs = discover_pdf_files(papers_dir)
            .into_iter()
            .filter(|path| !referenced.contains(path))
            .collect();

        CatalogAudit {
            missing_pdfs,
            unreferenced_pdfs,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CatalogAudit {
    pub missing_pdfs: Vec<String>,
    pub unreferenced_pdfs: Vec<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MetadataValue;
    use tempfile::tempdir;

    const SAMPLE: &str = r#"{
        "papers": [
            {"id": "p1", "title": "Graph Neural Nets", "authors": ["A. Smith", "B. Jones"],
             "year": 2020, "venue": "NeurIPS", "doi": "10.1/x", "filename": "p1.pdf"},
            {"id": "p2", "title": "Attention Everywhere", "authors": [],
             "year": "2021", "filename": "p2.pdf", "section": "transformers"}
        ]
    }"#;

    #[test]
    fn catalog_accepts_numeric_and_string_years() -> Result<(), ConfigError> {
        let catalog = Catalog::from_json(SAMPLE)?;
        assert_eq!(catalog.papers[0].year, Some(2020));
        assert_eq!(catalog.papers[1].year, Some(2021));
        assert_eq!(catalog.papers[1].venue, None);
        Ok(())
    }

    #[test]
    fn titles_are_listed_as_bullets() -> Result<(), ConfigError> {
        let catalog = Catalog::from_json(SAMPLE)?;
        assert_eq!(
            catalog.titles_listing(),
            "- Graph Neural Nets\n- Attention Everywhere"
        );
        assert_eq!(Catalog::default().titles_listing(), EMPTY_CATALOG_MESSAGE);
        Ok(())
    }

    #[test]
    fn base_metadata_joins_authors_and_keeps_scalars() -> Result<(), ConfigError> {
        let catalog = Catalog::from_json(SAMPLE)?;
        let metadata = catalog.papers[0].base_metadata();
        assert_eq!(metadata["paper_id"], MetadataValue::from("p1"));
        assert_eq!(metadata["title"], MetadataValue::from("Graph Neural Nets"));
        assert_eq!(metadata["authors"], MetadataValue::from("A. Smith, B. Jones"));
        assert_eq!(metadata["year"], MetadataValue::Int(2020));
        assert_eq!(metadata["section"], MetadataValue::from(""));
        Ok(())
    }

    #[test]
    fn missing_catalog_is_a_config_error() {
        let result = Catalog::load(Path::new("/definitely/not/here.json"));
        assert!(matches!(result, Err(ConfigError::CatalogMissing(_))));
    }

    #[test]
    fn audit_reports_missing_and_unreferenced_pdfs() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        fs::write(dir.path().join("p1.pdf"), b"%PDF-1.4")?;
        fs::write(dir.path().join("stray.pdf"), b"%PDF-1.4")?;

        let catalog = Catalog::from_json(SAMPLE)?;
        let audit = catalog.audit(dir.path());

        assert_eq!(audit.missing_pdfs, vec!["p2.pdf".to_string()]);
        assert_eq!(audit.unreferenced_pdfs, vec![dir.path().join("stray.pdf")]);
        Ok(())
    }
}
