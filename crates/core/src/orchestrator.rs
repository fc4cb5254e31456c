use crate::catalog::Catalog;
use crate::embeddings::Embedder;
use crate::generator::Generator;
use crate::llm::LanguageModel;
use crate::models::{AnswerBody, PipelineResponse, QueryIntent};
use crate::prompts::Strategy;
use crate::retriever::Retriever;
use crate::router::MetadataRouter;
use crate::traits::VectorIndex;
use crate::PipelineError;
use std::collections::BTreeMap;
use tracing::info;

/// Routes a question to the catalog listing or to retrieval plus generation.
pub struct ResearchPipeline<E, V, L>
where
    E: Embedder,
    V: VectorIndex,
    L: LanguageModel,
{
    router: MetadataRouter,
    catalog: Catalog,
    retriever: Retriever<E, V>,
    generator: Generator<L>,
    top_k: usize,
}

impl<E, V, L> ResearchPipeline<E, V, L>
where
    E: Embedder,
    V: VectorIndex,
    L: LanguageModel,
{
    pub fn new(
        router: MetadataRouter,
        catalog: Catalog,
        retriever: Retriever<E, V>,
        generator: Generator<L>,
        top_k: usize,
    ) -> Self {
        Self {
            router,
            catalog,
            retriever,
            generator,
            top_k,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub async fn query(
        &self,
        question: &str,
        strategy: Strategy,
    ) -> Result<PipelineResponse, PipelineError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(PipelineError::InvalidQuestion("question is empty".to_string()));
        }

        let decision = self.router.route(question);
        info!(intent = ?decision.intent, matched = ?decision.matched, "routed question");

        if decision.intent == QueryIntent::Catalog {
            return Ok(PipelineResponse {
                question: question.to_string(),
                intent: QueryIntent::Catalog,
                answer: AnswerBody::Text(self.catalog.titles_listing()),
                citations: Vec::new(),
                citation_map: BTreeMap::new(),
                retrieved_chunks: Vec::new(),
            });
        }

        let retrieved_chunks = self.retriever.retrieve(question, self.top_k).await?;
        let answer = self
            .generator
            .generate(question, &retrieved_chunks, strategy)
            .await?;

        Ok(PipelineResponse {
            question: question.to_string(),
            intent: QueryIntent::Content,
            answer: answer.answer,
            citations: answer.citations,
            citation_map: answer.citation_map,
            retrieved_chunks,
        })
    }
}
