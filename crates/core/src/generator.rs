use crate::error::GenerateError;
use crate::llm::LanguageModel;
use crate::models::{Answer, AnswerBody, Citation, Metadata, RetrievedChunk};
use crate::prompts::{render_prompt, PromptLibrary, Strategy};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use tracing::{info, warn};

pub const NO_CONTEXT_ANSWER: &str = "No relevant documents found in the retrieved papers.";
pub const INVALID_JSON_MESSAGE: &str = "Model did not return valid JSON.";

const CONTEXT_SEPARATOR: &str = "\n\n---\n\n";

pub struct Generator<L: LanguageModel> {
    model: L,
    prompts: PromptLibrary,
}

impl<L: LanguageModel> Generator<L> {
    pub fn new(model: L, prompts: PromptLibrary) -> Self {
        Self { model, prompts }
    }

    pub async fn generate(
        &self,
        question: &str,
        chunks: &[RetrievedChunk],
        strategy: Strategy,
    ) -> Result<Answer, GenerateError> {
        if chunks.is_empty() {
            return Ok(Answer {
                answer: AnswerBody::Text(NO_CONTEXT_ANSWER.to_string()),
                citations: Vec::new(),
                citation_map: BTreeMap::new(),
            });
        }

        let template = self.prompts.load(strategy)?;
        let context = format_context(chunks);
        let prompt = render_prompt(&template, question, &context);

        info!(%strategy, chunks = chunks.len(), prompt_chars = prompt.len(), "generating answer");
        let raw = self.model.complete(&prompt).await?;

        let answer = if strategy.expects_json() {
            parse_structured_answer(&raw)
        } else {
            AnswerBody::Text(raw)
        };

        let (citations, citation_map) = format_citations(chunks);
        Ok(Answer {
            answer,
            citations,
            citation_map,
        })
    }
}

fn present(metadata: &Metadata, key: &str) -> Option<String> {
    metadata
        .get(key)
        .filter(|value| value.is_present())
        .map(ToString::to_string)
}

/// Numbered `[Source n]` blocks carrying whatever bibliographic fields each chunk has.
pub fn format_context(chunks: &[RetrievedChunk]) -> String {
    chunks
        .iter()
        .enumerate()
        .map(|(position, chunk)| {
            let mut block = format!("[Source {}]\n", position + 1);
            for (label, key) in [("Title", "title"), ("Authors", "authors"), ("Year", "year")] {
                if let Some(value) = present(&chunk.metadata, key) {
                    block.push_str(&format!("{label}: {value}\n"));
                }
            }
            block.push('\n');
            block.push_str(&chunk.document);
            block
        })
        .collect::<Vec<_>>()
        .join(CONTEXT_SEPARATOR)
}

/// Citations in chunk order for chunks with title, authors and year; others are skipped.
pub fn format_citations(chunks: &[RetrievedChunk]) -> (Vec<Citation>, BTreeMap<usize, String>) {
    let mut citations = Vec::new();
    let mut citation_map = BTreeMap::new();

    for chunk in chunks {
        let (Some(title), Some(authors), Some(year)) = (
            present(&chunk.metadata, "title"),
            present(&chunk.metadata, "authors"),
            present(&chunk.metadata, "year"),
        ) else {
            continue;
        };

        let index = citations.len() + 1;
        let text = format!("{authors} ({year}). {title}.");
        citation_map.insert(index, text.clone());
        citations.push(Citation { index, text });
    }

    (citations, citation_map)
}

/// Parses model output as JSON; failures keep the raw text in an error payload.
pub fn parse_structured_answer(raw: &str) -> AnswerBody {
    let candidate = strip_code_fence(raw);
    match serde_json::from_str::<Value>(candidate) {
        Ok(value) => AnswerBody::Structured(value),
        Err(error) => {
            warn!(%error, "model output was not valid JSON");
            AnswerBody::Structured(json!({
                "error": INVALID_JSON_MESSAGE,
                "raw_output": raw,
            }))
        }
    }
}

fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MetadataValue;
    use crate::SearchError;
    use async_trait::async_trait;
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use tempfile::{tempdir, TempDir};

    struct ScriptedModel {
        reply: String,
        calls: AtomicUsize,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedModel {
        fn new(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: reply.to_string(),
                calls: AtomicUsize::new(0),
                prompts: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl LanguageModel for ScriptedModel {
        async fn complete(&self, prompt: &str) -> Result<String, SearchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Ok(mut prompts) = self.prompts.lock() {
                prompts.push(prompt.to_string());
            }
            Ok(self.reply.clone())
        }
    }

    fn prompt_dir() -> Result<TempDir, std::io::Error> {
        let dir = tempdir()?;
        for strategy in Strategy::ALL {
            fs::write(
                dir.path().join(format!("{}.txt", strategy.id())),
                "Context:\n{context}\n\nQuestion: {question}",
            )?;
        }
        Ok(dir)
    }

    fn cited_chunk(text: &str) -> RetrievedChunk {
        let mut metadata = Metadata::new();
        metadata.insert("title".to_string(), "Graph Neural Nets".into());
        metadata.insert("authors".to_string(), "A. Smith".into());
        metadata.insert("year".to_string(), MetadataValue::Int(2020));
        RetrievedChunk {
            document: text.to_string(),
            metadata,
            distance: Some(0.1),
        }
    }

    fn uncited_chunk(text: &str) -> RetrievedChunk {
        let mut metadata = Metadata::new();
        metadata.insert("title".to_string(), "Untitled Draft".into());
        metadata.insert("year".to_string(), MetadataValue::Null);
        RetrievedChunk {
            document: text.to_string(),
            metadata,
            distance: None,
        }
    }

    #[tokio::test]
    async fn empty_context_short_circuits_for_every_strategy() -> Result<(), Box<dyn std::error::Error>> {
        let dir = prompt_dir()?;
        let model = ScriptedModel::new("should not be used");
        let generator = Generator::new(Arc::clone(&model), PromptLibrary::new(dir.path()));

        for strategy in Strategy::ALL {
            let answer = generator.generate("anything?", &[], strategy).await?;
            assert_eq!(answer.answer, AnswerBody::Text(NO_CONTEXT_ANSWER.to_string()));
            assert!(answer.citations.is_empty());
            assert!(answer.citation_map.is_empty());
        }
        assert_eq!(model.calls.load(Ordering::SeqCst), 0);
        Ok(())
    }

    #[tokio::test]
    async fn citations_skip_chunks_without_bibliography() -> Result<(), Box<dyn std::error::Error>> {
        let dir = prompt_dir()?;
        let model = ScriptedModel::new("GNNs pass messages [1].");
        let generator = Generator::new(Arc::clone(&model), PromptLibrary::new(dir.path()));
        let chunks = vec![
            uncited_chunk("draft text about pooling"),
            cited_chunk("message passing text"),
        ];

        let answer = generator
            .generate("How do GNNs work?", &chunks, Strategy::Delimiters)
            .await?;

        assert_eq!(answer.answer, AnswerBody::Text("GNNs pass messages [1].".to_string()));
        assert_eq!(
            answer.citations,
            vec![Citation {
                index: 1,
                text: "A. Smith (2020). Graph Neural Nets.".to_string()
            }]
        );
        assert_eq!(
            answer.citation_map.get(&1).map(String::as_str),
            Some("A. Smith (2020). Graph Neural Nets.")
        );

        let prompts = model.prompts.lock().map_err(|_| "poisoned")?;
        assert!(prompts[0].contains("draft text about pooling"));
        assert!(prompts[0].contains("message passing text"));
        assert!(prompts[0].contains("Question: How do GNNs work?"));
        Ok(())
    }

    #[tokio::test]
    async fn invalid_json_keeps_raw_output() -> Result<(), Box<dyn std::error::Error>> {
        let dir = prompt_dir()?;
        let model = ScriptedModel::new("not json at all");
        let generator = Generator::new(Arc::clone(&model), PromptLibrary::new(dir.path()));

        let answer = generator
            .generate("q", &[cited_chunk("text")], Strategy::JsonOutput)
            .await?;

        assert_eq!(
            answer.answer,
            AnswerBody::Structured(json!({
                "error": INVALID_JSON_MESSAGE,
                "raw_output": "not json at all",
            }))
        );
        assert_eq!(answer.citations.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn missing_prompt_asset_is_fatal() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let model = ScriptedModel::new("unused");
        let generator = Generator::new(Arc::clone(&model), PromptLibrary::new(dir.path()));

        let result = generator
            .generate("q", &[cited_chunk("text")], Strategy::FewShot)
            .await;
        assert!(matches!(result, Err(GenerateError::PromptNotFound(_))));
        Ok(())
    }

    #[test]
    fn fenced_json_is_accepted() {
        let parsed = parse_structured_answer("```json\n{\"answer\": \"yes\"}\n```");
        assert_eq!(parsed, AnswerBody::Structured(json!({"answer": "yes"})));
    }

    #[test]
    fn context_lists_available_fields_and_separates_sources() {
        let context = format_context(&[cited_chunk("first"), uncited_chunk("second")]);
        assert_eq!(
            context,
            "[Source 1]\nTitle: Graph Neural Nets\nAuthors: A. Smith\nYear: 2020\n\nfirst\
             \n\n---\n\n[Source 2]\nTitle: Untitled Draft\n\nsecond"
        );
    }
}
