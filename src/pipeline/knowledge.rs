use crate::llm::{LanguageModel, LlmError};
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info, warn};

/// Used when none of the configured artifact files exist
const TEMPLATE: &str = "Product Requirements Document Template:
1. Executive Summary: Brief overview of the product
2. Objectives: Clear business goals and success metrics
3. Features: Key functionalities and capabilities
4. User Stories: As a [user], I want [feature], so that [benefit]
5. Technical Requirements: Technology stack and infrastructure needs

Example Features:
- User authentication and profile management
- Data visualization and analytics
- Mobile-responsive interface
- Real-time notifications
- Integration with third-party services

Example User Stories:
- As a user, I want to create an account, so that I can save my preferences
- As a user, I want to view analytics, so that I can track my progress
- As a user, I want mobile access, so that I can use the app anywhere";

/// Boundaries tried, in order, when a chunk has to be cut
const SEPARATORS: [&str; 3] = ["\n\n", "\n", " "];

/// A retrievable slice of a reference document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub source: String,
    pub text: String,
}

/// In-memory reference corpus searched before prompting the model
///
/// Once [`KnowledgeBase::index`] has embedded every chunk, searches rank by
/// cosine similarity; until then they rank by shared terms.
#[derive(Debug, Clone, Default)]
pub struct KnowledgeBase {
    chunks: Vec<Chunk>,
    /// One vector per chunk, same order
    vectors: Option<Vec<Vec<f32>>>,
}

impl KnowledgeBase {
    /// Load and chunk the artifact files that exist
    ///
    /// Missing or unreadable files are skipped. If nothing could be read the
    /// built-in PRD template is used instead.
    pub fn load<I, P>(paths: I, chunk_size: usize, chunk_overlap: usize) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut documents = Vec::new();
        for path in paths {
            let path = path.as_ref();
            if !path.exists() {
                debug!(path = %path.display(), "knowledge artifact not found, skipping");
                continue;
            }
            match std::fs::read_to_string(path) {
                Ok(text) => documents.push((path.display().to_string(), text)),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "failed to read knowledge artifact")
                }
            }
        }
        if documents.is_empty() {
            return Self::template(chunk_size, chunk_overlap);
        }
        Self::from_documents(documents, chunk_size, chunk_overlap)
    }

    /// Knowledge base made only of the built-in PRD template
    pub fn template(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self::from_documents(
            vec![("template".to_string(), TEMPLATE.to_string())],
            chunk_size,
            chunk_overlap,
        )
    }

    /// Build a knowledge base from `(source, text)` pairs
    pub fn from_documents(
        documents: Vec<(String, String)>,
        chunk_size: usize,
        chunk_overlap: usize,
    ) -> Self {
        let chunks = documents
            .into_iter()
            .flat_map(|(source, text)| {
                split_text(&text, chunk_size, chunk_overlap)
                    .into_iter()
                    .map(move |text| Chunk {
                        source: source.clone(),
                        text,
                    })
            })
            .collect();
        Self {
            chunks,
            vectors: None,
        }
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn is_indexed(&self) -> bool {
        self.vectors.is_some()
    }

    /// Embed every chunk with `model`
    ///
    /// On error the knowledge base is left as it was and keeps ranking by
    /// shared terms.
    pub async fn index(&mut self, model: &dyn LanguageModel) -> Result<(), LlmError> {
        let texts: Vec<String> = self.chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = model.embed(&texts).await?;
        if vectors.len() != self.chunks.len() {
            return Err(LlmError::EmptyResponse);
        }
        info!(chunks = vectors.len(), "knowledge base embedded");
        self.vectors = Some(vectors);
        Ok(())
    }

    /// Return up to `k` chunks most similar to `query`
    ///
    /// Uses the embeddings when the knowledge base is indexed and the query
    /// can be embedded, otherwise falls back to [`KnowledgeBase::retrieve`].
    pub async fn search(&self, model: &dyn LanguageModel, query: &str, k: usize) -> Vec<&Chunk> {
        let Some(vectors) = &self.vectors else {
            return self.retrieve(query, k);
        };
        let query_vector = match model.embed(&[query.to_string()]).await {
            Ok(mut embedded) if embedded.len() == 1 => embedded.remove(0),
            Ok(_) => {
                warn!("query embedding missing, using keyword ranking");
                return self.retrieve(query, k);
            }
            Err(e) => {
                warn!(error = %e, "query embedding failed, using keyword ranking");
                return self.retrieve(query, k);
            }
        };

        let mut scored: Vec<(f32, usize)> = vectors
            .iter()
            .enumerate()
            .map(|(index, vector)| (cosine(&query_vector, vector), index))
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0).then(a.1.cmp(&b.1)));
        scored
            .into_iter()
            .take(k)
            .map(|(_, index)| &self.chunks[index])
            .collect()
    }

    /// Return up to `k` chunks ranked by how many query terms they contain
    ///
    /// Ties keep corpus order, so a query with no matching term still yields
    /// the first `k` chunks.
    pub fn retrieve(&self, query: &str, k: usize) -> Vec<&Chunk> {
        let query_terms = terms(query);
        let mut scored: Vec<(usize, usize)> = self
            .chunks
            .iter()
            .enumerate()
            .map(|(index, chunk)| {
                let chunk_terms = terms(&chunk.text);
                (query_terms.intersection(&chunk_terms).count(), index)
            })
            .collect();
        scored.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
        scored
            .into_iter()
            .take(k)
            .map(|(_, index)| &self.chunks[index])
            .collect()
    }
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

fn terms(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|word| word.chars().count() > 2)
        .map(str::to_lowercase)
        .collect()
}

/// Split text into chunks of at most `chunk_size` characters
///
/// Cuts prefer paragraph breaks, then line breaks, then spaces. Consecutive
/// chunks share up to `chunk_overlap` characters.
pub fn split_text(text: &str, chunk_size: usize, chunk_overlap: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let chunk_size = chunk_size.max(1);
    let overlap = chunk_overlap.min(chunk_size - 1);

    let mut chunks = Vec::new();
    let mut start = 0;
    while start < chars.len() {
        let mut end = (start + chunk_size).min(chars.len());
        if end < chars.len() {
            end = find_cut(&chars, start, end);
        }
        let chunk: String = chars[start..end].iter().collect();
        let chunk = chunk.trim();
        if !chunk.is_empty() {
            chunks.push(chunk.to_string());
        }
        if end == chars.len() {
            break;
        }
        start = end.saturating_sub(overlap).max(start + 1);
    }
    chunks
}

/// Latest separator boundary in the second half of `chars[start..end]`
fn find_cut(chars: &[char], start: usize, end: usize) -> usize {
    let floor = start + (end - start) / 2;
    for separator in SEPARATORS {
        let sep: Vec<char> = separator.chars().collect();
        let mut position = end;
        while position >= floor + sep.len() {
            if chars[position - sep.len()..position] == sep[..] {
                return position;
            }
            position -= 1;
        }
    }
    end
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::CompletionRequest;
    use async_trait::async_trait;
    use tempfile::TempDir;

    /// Embeds a text as counts of a few fixed keywords
    struct KeywordEmbedder {
        fail_queries: bool,
    }

    const KEYWORDS: [&str; 3] = ["payments", "walkers", "schema"];

    #[async_trait]
    impl LanguageModel for KeywordEmbedder {
        async fn complete(&self, _request: CompletionRequest) -> Result<String, LlmError> {
            Err(LlmError::EmptyResponse)
        }

        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, LlmError> {
            if self.fail_queries && texts.len() == 1 {
                return Err(LlmError::Unsupported("embeddings"));
            }
            Ok(texts
                .iter()
                .map(|text| {
                    let text = text.to_lowercase();
                    KEYWORDS.iter().map(|k| text.matches(k).count() as f32).collect()
                })
                .collect())
        }

        fn model_name(&self) -> &str {
            "keywords"
        }
    }

    fn corpus() -> KnowledgeBase {
        KnowledgeBase::from_documents(
            vec![
                ("schema.sql".to_string(), "schema schema tables".to_string()),
                ("adr.md".to_string(), "walkers get payments weekly, payments in bulk".to_string()),
                ("notes.md".to_string(), "walkers walkers walkers".to_string()),
            ],
            1000,
            200,
        )
    }

    #[test]
    fn test_short_text_is_one_chunk() {
        assert_eq!(split_text("  hello world ", 1000, 200), vec!["hello world"]);
        assert!(split_text("   ", 1000, 200).is_empty());
    }

    #[test]
    fn test_long_text_is_split_with_overlap() {
        let text = "word ".repeat(600);
        let chunks = split_text(&text, 1000, 200);

        assert!(chunks.len() >= 3);
        assert!(chunks.iter().all(|c| c.chars().count() <= 1000));
        // overlap: the second chunk starts inside the first
        let first: Vec<char> = chunks[0].chars().collect();
        let tail: String = first[first.len() - 50..].iter().collect();
        assert!(chunks[1].contains(tail.trim()));
    }

    #[test]
    fn test_split_prefers_paragraph_breaks() {
        let text = format!("{}\n\n{}", "a".repeat(700), "b".repeat(700));
        let chunks = split_text(&text, 1000, 0);
        assert_eq!(chunks[0], "a".repeat(700));
    }

    #[test]
    fn test_missing_files_fall_back_to_template() {
        let kb = KnowledgeBase::load(["does/not/exist.md"], 1000, 200);
        assert!(!kb.is_empty());
        assert_eq!(kb.retrieve("anything", 4)[0].source, "template");
    }

    #[test]
    fn test_load_reads_existing_files() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("adr.md");
        std::fs::write(&path, "Decision: use SQLite for storage").unwrap();

        let kb = KnowledgeBase::load([path.clone(), dir.path().join("missing.sql")], 1000, 200);
        assert_eq!(kb.len(), 1);
        assert_eq!(kb.retrieve("storage", 4)[0].source, path.display().to_string());
    }

    #[test]
    fn test_retrieve_ranks_by_term_overlap() {
        let kb = KnowledgeBase::from_documents(
            vec![
                ("a".to_string(), "billing invoices and payments".to_string()),
                ("b".to_string(), "user stories for a fitness tracker app".to_string()),
                ("c".to_string(), "fitness goals".to_string()),
            ],
            1000,
            200,
        );
        let hits = kb.retrieve("fitness tracker user stories", 2);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].source, "b");
        assert_eq!(hits[1].source, "c");
    }

    #[tokio::test]
    async fn test_search_ranks_by_embedding_similarity() {
        let model = KeywordEmbedder { fail_queries: false };
        let mut kb = corpus();
        assert!(!kb.is_indexed());
        kb.index(&model).await.unwrap();
        assert!(kb.is_indexed());

        let hits = kb.search(&model, "how are payments made", 2).await;
        assert_eq!(hits[0].source, "adr.md");
        let hits = kb.search(&model, "find walkers", 1).await;
        assert_eq!(hits[0].source, "notes.md");
    }

    #[tokio::test]
    async fn test_search_falls_back_to_terms() {
        // not indexed: no embedding calls at all
        let kb = corpus();
        let model = KeywordEmbedder { fail_queries: true };
        assert_eq!(kb.search(&model, "schema tables", 1).await[0].source, "schema.sql");

        // indexed, but the query cannot be embedded
        let mut kb = corpus();
        kb.index(&model).await.unwrap();
        assert_eq!(kb.search(&model, "schema tables", 1).await[0].source, "schema.sql");
    }

    #[tokio::test]
    async fn test_index_failure_keeps_keyword_ranking() {
        struct NoEmbeddings;

        #[async_trait]
        impl LanguageModel for NoEmbeddings {
            async fn complete(&self, _request: CompletionRequest) -> Result<String, LlmError> {
                Err(LlmError::EmptyResponse)
            }

            fn model_name(&self) -> &str {
                "none"
            }
        }

        let mut kb = corpus();
        let err = kb.index(&NoEmbeddings).await.unwrap_err();
        assert!(matches!(err, LlmError::Unsupported(_)));
        assert!(!kb.is_indexed());
        assert_eq!(kb.search(&NoEmbeddings, "walkers", 1).await[0].source, "adr.md");
    }

    #[test]
    fn test_cosine() {
        assert!((cosine(&[1.0, 0.0], &[2.0, 0.0]) - 1.0).abs() < 1e-6);
        assert_eq!(cosine(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
        assert_eq!(cosine(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
        assert_eq!(cosine(&[1.0], &[1.0, 1.0]), 0.0);
    }
}
