//! Answering pipeline: ingestion and query flows

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, error, info, instrument, warn};

use kba_core::{
    Chunk, DocumentSource, EmbeddingIndex, Error, LLMProvider, QueryResult, Result,
};

use crate::chunker::Chunker;
use crate::confidence::ConfidenceScorer;
use crate::config::PipelineConfig;
use crate::context::ContextAssembler;
use crate::generation::GenerationClient;
use crate::prompt::{PromptTemplate, PromptTemplates};
use crate::retriever::Retriever;

pub const APOLOGY_MESSAGE: &str =
    "I apologize, but I'm experiencing technical difficulties. Please try again later.";

pub const MODE: &str = "balanced";

/// Diagnostics for the running pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineStats {
    /// `None` when the index could not report a count
    pub vector_db_count: Option<usize>,
    pub knowledge_base_path: PathBuf,
    pub mode: String,
    pub model: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Healthy,
    Unavailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    pub backend: ComponentStatus,
    pub vector_db: ComponentStatus,
    pub mode: String,
    pub status: HealthStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Retrieval-augmented answering over an embedding index
pub struct RagPipeline<I, L, S>
where
    I: EmbeddingIndex,
    L: LLMProvider + ?Sized,
    S: DocumentSource,
{
    config: PipelineConfig,
    index: Arc<I>,
    source: S,
    chunker: Chunker,
    retriever: Retriever<I>,
    prompts: PromptTemplates,
    generator: GenerationClient<L>,
    scorer: ConfidenceScorer,
    // Serializes index writes: ingest batches and clears never interleave
    write_gate: Mutex<()>,
}

impl<I, L, S> RagPipeline<I, L, S>
where
    I: EmbeddingIndex,
    L: LLMProvider + ?Sized,
    S: DocumentSource,
{
    /// Build a pipeline, rejecting invalid configuration up front
    pub fn new(config: PipelineConfig, index: Arc<I>, backend: Arc<L>, source: S) -> Result<Self> {
        config.validate()?;

        let chunker = Chunker::from_config(&config.indexing)?;
        let retriever = Retriever::new(index.clone());
        let prompts = PromptTemplates::new(config.assistant_role.clone());
        let generator = GenerationClient::new(backend, config.retry.clone());
        let scorer = ConfidenceScorer::new(config.confidence_saturation);

        info!(
            chunk_size = config.indexing.chunk_size,
            chunk_overlap = config.indexing.chunk_overlap,
            top_k = config.top_k,
            model = generator.backend().model_id(),
            "Initialized RAG pipeline in {} mode",
            MODE
        );

        Ok(Self {
            config,
            index,
            source,
            chunker,
            retriever,
            prompts,
            generator,
            scorer,
            write_gate: Mutex::new(()),
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Answer `question` from the `top_k` most similar passages.
    ///
    /// Never fails: faults outside generation produce an apology answer with
    /// `error` set.
    #[instrument(skip(self))]
    pub async fn query(&self, question: &str, top_k: usize) -> QueryResult {
        let started = Instant::now();
        info!("Processing query");

        match self.answer(question, top_k).await {
            Ok(mut result) => {
                result.response_time = round2(started.elapsed().as_secs_f64());
                info!(
                    context_used = result.context_used,
                    confidence = result.confidence,
                    response_time = result.response_time,
                    "Query answered"
                );
                result
            }
            Err(e) => {
                error!(error = %e, "Query processing failed");
                QueryResult {
                    answer: APOLOGY_MESSAGE.to_string(),
                    sources: BTreeSet::new(),
                    relevant_chunks: Vec::new(),
                    context_used: false,
                    confidence: 0.0,
                    response_time: round2(started.elapsed().as_secs_f64()),
                    error: Some(e.to_string()),
                }
            }
        }
    }

    /// Answer with the configured `top_k`
    pub async fn query_with_defaults(&self, question: &str) -> QueryResult {
        self.query(question, self.config.top_k).await
    }

    async fn answer(&self, question: &str, top_k: usize) -> Result<QueryResult> {
        let passages = self.retriever.search(question, top_k).await?;
        let context_used = !passages.is_empty();

        let context = ContextAssembler::build(&passages);
        let prompt = self
            .prompts
            .render(PromptTemplate::select(context_used), question, &context);
        let answer = self.generator.generate(&prompt).await;

        let confidence = self.scorer.score(&passages);
        let sources = passages
            .iter()
            .map(|p| p.metadata.source.clone())
            .collect();

        Ok(QueryResult {
            answer,
            sources,
            relevant_chunks: passages,
            context_used,
            confidence,
            response_time: 0.0,
            error: None,
        })
    }

    /// Index every supported document under `dir`.
    ///
    /// Returns `false` when nothing was indexed, either because no chunks
    /// came out of the directory or because ingestion failed.
    #[instrument(skip(self), fields(dir = %dir.display()))]
    pub async fn ingest(&self, dir: &Path) -> bool {
        info!("Ingesting documents");

        match self.index_directory(dir).await {
            Ok(0) => {
                warn!("No documents found or processed");
                false
            }
            Ok(chunks) => {
                info!(chunks, "Ingestion complete");
                true
            }
            Err(e) => {
                error!(error = %e, "Document ingestion failed");
                false
            }
        }
    }

    /// Ingest the configured knowledge-base directory
    pub async fn ingest_default(&self) -> bool {
        let dir = self.config.knowledge_base_dir.clone();
        self.ingest(&dir).await
    }

    async fn index_directory(&self, dir: &Path) -> Result<usize> {
        let documents = self.source.process(dir).await?;

        let chunks: Vec<Chunk> = documents
            .iter()
            .flat_map(|doc| self.chunker.chunk(&doc.text, &doc.source))
            .collect();
        if chunks.is_empty() {
            return Ok(0);
        }

        let mut vectors = Vec::with_capacity(chunks.len());
        for batch in chunks.chunks(self.config.indexing.batch_size) {
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let embedded = self.index.embed(&texts).await?;
            if embedded.len() != texts.len() {
                return Err(Error::Embedding(format!(
                    "expected {} vectors, got {}",
                    texts.len(),
                    embedded.len()
                )));
            }
            vectors.extend(embedded);
            debug!(embedded = vectors.len(), total = chunks.len(), "Embedded batch");
        }

        let ids = chunks.iter().map(Chunk::id).collect();
        let count = chunks.len();

        let _guard = self.write_gate.lock().await;
        self.index.add(chunks, vectors, ids).await?;

        Ok(count)
    }

    /// Remove every chunk from the index
    pub async fn clear_knowledge(&self) -> Result<()> {
        let _guard = self.write_gate.lock().await;

        match self.index.clear().await {
            Ok(()) => {
                info!("Knowledge base cleared");
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "Failed to clear knowledge base");
                Err(e)
            }
        }
    }

    pub async fn stats(&self) -> PipelineStats {
        let vector_db_count = match self.index.count().await {
            Ok(count) => Some(count),
            Err(e) => {
                warn!(error = %e, "Could not count indexed chunks");
                None
            }
        };

        PipelineStats {
            vector_db_count,
            knowledge_base_path: self.config.knowledge_base_dir.clone(),
            mode: MODE.to_string(),
            model: self.generator.backend().model_id().to_string(),
        }
    }

    /// Probe the generation backend and the index concurrently
    pub async fn health_check(&self) -> HealthReport {
        let (backend, index) =
            futures::future::join(self.generator.backend().health_check(), self.index.count())
                .await;

        let mut errors = Vec::new();

        let backend = match backend {
            Ok(true) => ComponentStatus::Healthy,
            Ok(false) => {
                errors.push("backend: unexpected response".to_string());
                ComponentStatus::Unavailable
            }
            Err(e) => {
                errors.push(format!("backend: {}", e));
                ComponentStatus::Unavailable
            }
        };

        let vector_db = match index {
            Ok(_) => ComponentStatus::Healthy,
            Err(e) => {
                errors.push(format!("vector_db: {}", e));
                ComponentStatus::Unavailable
            }
        };

        let status = match (backend, vector_db) {
            (ComponentStatus::Healthy, ComponentStatus::Healthy) => HealthStatus::Healthy,
            (ComponentStatus::Unavailable, ComponentStatus::Unavailable) => HealthStatus::Unhealthy,
            _ => HealthStatus::Degraded,
        };

        if status != HealthStatus::Healthy {
            warn!(?backend, ?vector_db, "Health check found unavailable components");
        }

        HealthReport {
            backend,
            vector_db,
            mode: MODE.to_string(),
            status,
            error: (!errors.is_empty()).then(|| errors.join("; ")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document_source::DirectoryDocumentSource;
    use crate::embedder::HashEmbedder;
    use crate::generation::CONNECTION_FAILURE_MESSAGE;
    use crate::vector_store::LocalVectorStore;
    use async_trait::async_trait;
    use kba_core::{Embedder, GenerationConfig, GenerationResult, IndexMatch};
    use std::fs;
    use std::sync::Mutex as StdMutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use kba_core::SourceText;
    use tokio::sync::Notify;

    /// Backend fake that records prompts and answers with a fixed text
    struct RecordingBackend {
        prompts: StdMutex<Vec<String>>,
        up: bool,
    }

    impl RecordingBackend {
        fn new(up: bool) -> Arc<Self> {
            Arc::new(Self {
                prompts: StdMutex::new(Vec::new()),
                up,
            })
        }

        fn last_prompt(&self) -> String {
            self.prompts.lock().unwrap().last().cloned().unwrap_or_default()
        }
    }

    #[async_trait]
    impl LLMProvider for RecordingBackend {
        async fn generate(&self, prompt: &str) -> Result<GenerationResult> {
            self.generate_with_config(prompt, &GenerationConfig::default()).await
        }

        async fn generate_with_config(
            &self,
            prompt: &str,
            config: &GenerationConfig,
        ) -> Result<GenerationResult> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            if !self.up {
                return Err(Error::Connection("connection refused".into()));
            }
            Ok(GenerationResult {
                text: "Check the VPN certificate.".to_string(),
                model_id: config.model_id.clone(),
            })
        }

        async fn health_check(&self) -> Result<bool> {
            if self.up {
                Ok(true)
            } else {
                Err(Error::Connection("connection refused".into()))
            }
        }

        fn model_id(&self) -> &str {
            "llama3.2"
        }
    }

    /// Embedder wrapper counting batch calls
    struct CountingEmbedder {
        inner: HashEmbedder,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Embedder for CountingEmbedder {
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.embed(texts).await
        }

        fn dimension(&self) -> Option<usize> {
            self.inner.dimension()
        }
    }

    /// Index whose every operation fails
    struct BrokenIndex;

    #[async_trait]
    impl EmbeddingIndex for BrokenIndex {
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![0.0; 4]).collect())
        }

        async fn add(&self, _: Vec<Chunk>, _: Vec<Vec<f32>>, _: Vec<String>) -> Result<()> {
            Err(Error::Other("index is read-only".into()))
        }

        async fn query(&self, _: &[f32], _: usize) -> Result<Vec<IndexMatch>> {
            Err(Error::Other("corrupt posting list".into()))
        }

        async fn count(&self) -> Result<usize> {
            Err(Error::VectorStore("database locked".into()))
        }

        async fn clear(&self) -> Result<()> {
            Err(Error::VectorStore("database locked".into()))
        }
    }

    /// Source handing back one fixed document whatever the path
    struct FixedSource(String);

    #[async_trait]
    impl DocumentSource for FixedSource {
        async fn process(&self, _: &Path) -> Result<Vec<SourceText>> {
            Ok(vec![SourceText {
                text: self.0.clone(),
                source: "handbook.txt".to_string(),
            }])
        }

        fn supports(&self, _: &Path) -> bool {
            true
        }
    }

    /// Index whose `add` lingers, recording how many writes overlap
    #[derive(Default)]
    struct GatedIndex {
        stored: StdMutex<usize>,
        active: AtomicUsize,
        peak: AtomicUsize,
        add_started: Notify,
        seen_by_clear: StdMutex<Option<usize>>,
    }

    impl GatedIndex {
        fn enter(&self) {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
        }

        fn leave(&self) {
            self.active.fetch_sub(1, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl EmbeddingIndex for GatedIndex {
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![1.0; 4]).collect())
        }

        async fn add(&self, chunks: Vec<Chunk>, _: Vec<Vec<f32>>, _: Vec<String>) -> Result<()> {
            self.enter();
            self.add_started.notify_one();
            tokio::time::sleep(Duration::from_millis(50)).await;
            *self.stored.lock().unwrap() += chunks.len();
            self.leave();
            Ok(())
        }

        async fn query(&self, _: &[f32], _: usize) -> Result<Vec<IndexMatch>> {
            Ok(Vec::new())
        }

        async fn count(&self) -> Result<usize> {
            Ok(*self.stored.lock().unwrap())
        }

        async fn clear(&self) -> Result<()> {
            self.enter();
            let mut stored = self.stored.lock().unwrap();
            *self.seen_by_clear.lock().unwrap() = Some(*stored);
            *stored = 0;
            drop(stored);
            self.leave();
            Ok(())
        }
    }

    type LocalPipeline = RagPipeline<LocalVectorStore, RecordingBackend, DirectoryDocumentSource>;

    fn small_config() -> PipelineConfig {
        let mut config = PipelineConfig::default();
        config.indexing.chunk_size = 20;
        config.indexing.chunk_overlap = 5;
        config
    }

    fn local_pipeline(config: PipelineConfig, backend: Arc<RecordingBackend>) -> LocalPipeline {
        let store = Arc::new(LocalVectorStore::new(Arc::new(HashEmbedder::default())));
        RagPipeline::new(config, store, backend, DirectoryDocumentSource::default()).unwrap()
    }

    fn write_knowledge_base(dir: &Path) {
        fs::write(
            dir.join("vpn.md"),
            "# VPN troubleshooting\n\nIf the VPN client cannot connect, check that the client \
             certificate has not expired and that the clock is in sync.",
        )
        .unwrap();
        fs::write(
            dir.join("printers.txt"),
            "When the printer queue is stuck, restart the print spooler service and clear pending jobs.",
        )
        .unwrap();
    }

    #[test]
    fn test_invalid_chunking_is_rejected_at_construction() {
        let mut config = PipelineConfig::default();
        config.indexing.chunk_overlap = config.indexing.chunk_size;
        let store = Arc::new(LocalVectorStore::new(Arc::new(HashEmbedder::default())));

        let result = RagPipeline::new(
            config,
            store,
            RecordingBackend::new(true),
            DirectoryDocumentSource::default(),
        );
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[tokio::test]
    async fn test_query_against_empty_index() {
        let backend = RecordingBackend::new(true);
        let pipeline = local_pipeline(PipelineConfig::default(), backend.clone());

        let result = pipeline.query("unanswerable question", 5).await;

        assert!(!result.context_used);
        assert_eq!(result.confidence, 0.0);
        assert!(!result.answer.is_empty());
        assert!(result.sources.is_empty());
        assert!(result.relevant_chunks.is_empty());
        assert!(result.error.is_none());
        assert!(backend.last_prompt().contains("No relevant information was found"));
    }

    #[tokio::test]
    async fn test_ingest_then_query() {
        let dir = tempfile::tempdir().unwrap();
        write_knowledge_base(dir.path());

        let backend = RecordingBackend::new(true);
        let pipeline = local_pipeline(small_config(), backend.clone());

        assert!(pipeline.ingest(dir.path()).await);
        assert!(pipeline.stats().await.vector_db_count.unwrap() >= 2);

        let result = pipeline.query("VPN client cannot connect", 1).await;
        assert!(result.context_used);
        assert_eq!(result.answer, "Check the VPN certificate.");
        assert_eq!(result.relevant_chunks.len(), 1);
        assert!(result.sources.contains("vpn.md"));
        assert!(result.confidence > 0.0 && result.confidence <= 1.0);

        let prompt = backend.last_prompt();
        assert!(prompt.contains("KNOWLEDGE BASE CONTENT:"));
        assert!(prompt.contains("--- Document 1: vpn.md (Relevance: "));
        assert!(prompt.contains("USER QUESTION: VPN client cannot connect"));
    }

    #[tokio::test]
    async fn test_reingest_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        write_knowledge_base(dir.path());
        let pipeline = local_pipeline(small_config(), RecordingBackend::new(true));

        assert!(pipeline.ingest(dir.path()).await);
        let first = pipeline.stats().await.vector_db_count;
        assert!(pipeline.ingest(dir.path()).await);
        assert_eq!(pipeline.stats().await.vector_db_count, first);
    }

    #[tokio::test]
    async fn test_ingest_directory_without_supported_files() {
        let kb = tempfile::tempdir().unwrap();
        write_knowledge_base(kb.path());
        let empty = tempfile::tempdir().unwrap();
        fs::write(empty.path().join("scan.pdf"), "%PDF-1.4").unwrap();

        let pipeline = local_pipeline(small_config(), RecordingBackend::new(true));
        assert!(pipeline.ingest(kb.path()).await);
        let before = pipeline.stats().await.vector_db_count;

        assert!(!pipeline.ingest(empty.path()).await);
        assert_eq!(pipeline.stats().await.vector_db_count, before);
    }

    #[tokio::test]
    async fn test_ingest_missing_directory_is_false() {
        let pipeline = local_pipeline(PipelineConfig::default(), RecordingBackend::new(true));
        assert!(!pipeline.ingest(Path::new("/no/such/knowledge-base")).await);
    }

    #[tokio::test]
    async fn test_ingest_embeds_in_batches() {
        let dir = tempfile::tempdir().unwrap();
        let text = (0..100).map(|i| format!("word{}", i)).collect::<Vec<_>>().join(" ");
        fs::write(dir.path().join("long.txt"), text).unwrap();

        let calls = Arc::new(AtomicUsize::new(0));
        let embedder = CountingEmbedder {
            inner: HashEmbedder::default(),
            calls: calls.clone(),
        };
        let store = Arc::new(LocalVectorStore::new(Arc::new(embedder)));

        // 100 words, stride 15 -> 7 chunks, batches of 3 -> 3 embed calls
        let mut config = small_config();
        config.indexing.batch_size = 3;
        let pipeline = RagPipeline::new(
            config,
            store.clone(),
            RecordingBackend::new(true),
            DirectoryDocumentSource::default(),
        )
        .unwrap();

        assert!(pipeline.ingest(dir.path()).await);
        assert_eq!(store.count().await.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retrieval_fault_yields_apology() {
        let pipeline = RagPipeline::new(
            PipelineConfig::default(),
            Arc::new(BrokenIndex),
            RecordingBackend::new(true),
            DirectoryDocumentSource::default(),
        )
        .unwrap();

        let result = pipeline.query("anything", 5).await;
        assert_eq!(result.answer, APOLOGY_MESSAGE);
        assert!(!result.context_used);
        assert_eq!(result.confidence, 0.0);
        assert!(result.sources.is_empty());
        assert!(result.error.unwrap().contains("corrupt posting list"));
    }

    #[tokio::test]
    async fn test_zero_top_k_yields_apology() {
        let pipeline = local_pipeline(PipelineConfig::default(), RecordingBackend::new(true));
        let result = pipeline.query("anything", 0).await;
        assert_eq!(result.answer, APOLOGY_MESSAGE);
        assert!(result.error.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_backend_down_still_answers() {
        let pipeline = local_pipeline(PipelineConfig::default(), RecordingBackend::new(false));
        let result = pipeline.query("anything", 5).await;
        assert_eq!(result.answer, CONNECTION_FAILURE_MESSAGE);
        assert!(result.error.is_none());
    }

    #[tokio::test]
    async fn test_clear_knowledge() {
        let dir = tempfile::tempdir().unwrap();
        write_knowledge_base(dir.path());
        let pipeline = local_pipeline(small_config(), RecordingBackend::new(true));

        assert!(pipeline.ingest(dir.path()).await);
        pipeline.clear_knowledge().await.unwrap();
        assert_eq!(pipeline.stats().await.vector_db_count, Some(0));
    }

    #[tokio::test]
    async fn test_clear_failure_propagates() {
        let pipeline = RagPipeline::new(
            PipelineConfig::default(),
            Arc::new(BrokenIndex),
            RecordingBackend::new(true),
            DirectoryDocumentSource::default(),
        )
        .unwrap();
        assert!(matches!(pipeline.clear_knowledge().await, Err(Error::VectorStore(_))));
    }

    #[tokio::test]
    async fn test_stats_with_unreachable_index() {
        let pipeline = RagPipeline::new(
            PipelineConfig::default(),
            Arc::new(BrokenIndex),
            RecordingBackend::new(true),
            DirectoryDocumentSource::default(),
        )
        .unwrap();

        let stats = pipeline.stats().await;
        assert_eq!(stats.vector_db_count, None);
        assert_eq!(stats.mode, "balanced");
        assert_eq!(stats.model, "llama3.2");
        assert_eq!(stats.knowledge_base_path, PathBuf::from("knowledge-base"));
    }

    #[tokio::test]
    async fn test_health_statuses() {
        let healthy = local_pipeline(PipelineConfig::default(), RecordingBackend::new(true));
        let report = healthy.health_check().await;
        assert_eq!(report.status, HealthStatus::Healthy);
        assert!(report.error.is_none());

        let degraded = local_pipeline(PipelineConfig::default(), RecordingBackend::new(false));
        let report = degraded.health_check().await;
        assert_eq!(report.backend, ComponentStatus::Unavailable);
        assert_eq!(report.vector_db, ComponentStatus::Healthy);
        assert_eq!(report.status, HealthStatus::Degraded);

        let unhealthy = RagPipeline::new(
            PipelineConfig::default(),
            Arc::new(BrokenIndex),
            RecordingBackend::new(false),
            DirectoryDocumentSource::default(),
        )
        .unwrap();
        let report = unhealthy.health_check().await;
        assert_eq!(report.status, HealthStatus::Unhealthy);
        assert!(report.error.unwrap().contains("vector_db: "));
    }

    #[tokio::test]
    async fn test_clear_waits_for_in_flight_ingest() {
        let index = Arc::new(GatedIndex::default());
        let words: Vec<String> = (0..60).map(|i| format!("word{}", i)).collect();
        let source = FixedSource(words.join(" "));
        let pipeline = Arc::new(
            RagPipeline::new(small_config(), index.clone(), RecordingBackend::new(true), source)
                .unwrap(),
        );

        let ingest = {
            let pipeline = pipeline.clone();
            tokio::spawn(async move { pipeline.ingest(Path::new("kb")).await })
        };

        index.add_started.notified().await;
        pipeline.clear_knowledge().await.unwrap();
        assert!(ingest.await.unwrap());

        assert_eq!(index.peak.load(Ordering::SeqCst), 1);
        let seen = index.seen_by_clear.lock().unwrap().unwrap();
        assert!(seen > 0, "clear ran before the add finished");
        assert_eq!(index.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_ingest_default_uses_configured_directory() {
        let dir = tempfile::tempdir().unwrap();
        write_knowledge_base(dir.path());

        let mut config = small_config();
        config.knowledge_base_dir = dir.path().to_path_buf();
        let pipeline = local_pipeline(config, RecordingBackend::new(true));

        assert!(pipeline.ingest_default().await);
        assert!(pipeline.stats().await.vector_db_count.unwrap() >= 2);
        assert!(pipeline.query("printer queue stuck", 1).await.sources.contains("printers.txt"));
    }

    #[tokio::test]
    async fn test_concurrent_queries_share_the_index() {
        let dir = tempfile::tempdir().unwrap();
        write_knowledge_base(dir.path());
        let pipeline = Arc::new(local_pipeline(small_config(), RecordingBackend::new(true)));
        assert!(pipeline.ingest(dir.path()).await);

        let handles: Vec<_> = ["printer queue stuck", "vpn certificate expired"]
            .into_iter()
            .map(|question| {
                let pipeline = pipeline.clone();
                tokio::spawn(async move { pipeline.query(question, 2).await })
            })
            .collect();

        for handle in handles {
            let result = handle.await.unwrap();
            assert!(result.context_used);
            assert!(result.error.is_none());
        }
    }
}
