//! Concurrent lexical + vector retrieval with per-path timeouts.
//!
//! Both paths run under `tokio::join!`, each inside its own
//! `tokio::time::timeout`. A failed or late path is logged and absorbed; the
//! request only fails when neither path produced a list.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use sift_core::logging::query_hash;
use sift_core::{
    EmbeddingBackend, LexicalStore, RetrievalCandidate, RetrievalError, RetrievalPath,
    ValidatedFilters, VectorStore,
};

type PathResult = std::result::Result<Vec<RetrievalCandidate>, RetrievalError>;

/// Per-path results of one retrieval. At least one path succeeded.
#[derive(Debug, Clone)]
pub struct RetrievalOutcome {
    pub bm25: PathResult,
    pub vector: PathResult,
}

impl RetrievalOutcome {
    /// Union of both paths keyed by `chunk_id`.
    pub fn merged(&self) -> Vec<RetrievalCandidate> {
        let empty: &[RetrievalCandidate] = &[];
        merge_candidates([
            self.bm25.as_deref().unwrap_or(empty),
            self.vector.as_deref().unwrap_or(empty),
        ])
    }

    pub fn bm25_hits(&self) -> usize {
        self.bm25.as_ref().map_or(0, Vec::len)
    }

    pub fn vector_hits(&self) -> usize {
        self.vector.as_ref().map_or(0, Vec::len)
    }

    /// The path that failed, if the outcome is degraded.
    pub fn failed_path(&self) -> Option<RetrievalPath> {
        match (&self.bm25, &self.vector) {
            (Err(_), _) => Some(RetrievalPath::Bm25),
            (_, Err(_)) => Some(RetrievalPath::Vector),
            _ => None,
        }
    }
}

/// Merge candidate lists by `chunk_id`.
///
/// Raw scores combine per path with the first present value winning, so a
/// chunk returned by both paths carries both scores. The output is ordered by
/// `chunk_id`, which makes the merge independent of list order.
pub fn merge_candidates<'a, I>(lists: I) -> Vec<RetrievalCandidate>
where
    I: IntoIterator<Item = &'a [RetrievalCandidate]>,
{
    let mut merged: BTreeMap<String, RetrievalCandidate> = BTreeMap::new();
    for list in lists {
        for c in list {
            match merged.get_mut(&c.chunk_id) {
                Some(existing) => {
                    existing.raw_bm25_score = existing.raw_bm25_score.or(c.raw_bm25_score);
                    existing.raw_vector_score = existing.raw_vector_score.or(c.raw_vector_score);
                }
                None => {
                    merged.insert(c.chunk_id.clone(), c.clone());
                }
            }
        }
    }
    merged.into_values().collect()
}

/// Runs both retrieval paths for a query.
pub struct RetrievalOrchestrator {
    lexical: Arc<dyn LexicalStore>,
    vectors: Arc<dyn VectorStore>,
    embedder: Arc<dyn EmbeddingBackend>,
    path_timeout: Duration,
}

impl RetrievalOrchestrator {
    pub fn new(
        lexical: Arc<dyn LexicalStore>,
        vectors: Arc<dyn VectorStore>,
        embedder: Arc<dyn EmbeddingBackend>,
        path_timeout: Duration,
    ) -> Self {
        Self {
            lexical,
            vectors,
            embedder,
            path_timeout,
        }
    }

    pub fn path_timeout(&self) -> Duration {
        self.path_timeout
    }

    /// Retrieve from both paths concurrently.
    ///
    /// Each path's list is capped at `candidate_limit` and carries only that
    /// path's raw score. Returns `BothPathsFailed` when neither path succeeded.
    pub async fn retrieve(
        &self,
        query_text: &str,
        filters: &ValidatedFilters,
        candidate_limit: usize,
    ) -> std::result::Result<RetrievalOutcome, RetrievalError> {
        let start = Instant::now();
        let hash = query_hash(query_text);

        let lexical = self.run_path(
            RetrievalPath::Bm25,
            candidate_limit,
            self.lexical.search_lexical(query_text, filters, candidate_limit),
        );
        let vector = self.run_path(RetrievalPath::Vector, candidate_limit, async {
            let embedding = self.embedder.embed(query_text).await?;
            self.vectors
                .search_vector(&embedding, filters, candidate_limit)
                .await
        });

        let (bm25, vector) = tokio::join!(lexical, vector);

        let outcome = match (bm25, vector) {
            (Err(b), Err(v)) => {
                warn!(
                    subsystem = "search",
                    component = "orchestrator",
                    query_hash = %hash,
                    bm25_error = %b,
                    vector_error = %v,
                    "Both retrieval paths failed"
                );
                return Err(RetrievalError::BothPathsFailed {
                    bm25: b.reason(),
                    vector: v.reason(),
                });
            }
            (bm25, vector) => RetrievalOutcome { bm25, vector },
        };

        for err in [&outcome.bm25, &outcome.vector]
            .into_iter()
            .filter_map(|r| r.as_ref().err())
        {
            if let RetrievalError::PathFailed { path, reason } = err {
                warn!(
                    subsystem = "search",
                    component = "orchestrator",
                    query_hash = %hash,
                    path = %path,
                    error = %reason,
                    "Retrieval path failed, continuing with the other path"
                );
            }
        }

        debug!(
            subsystem = "search",
            component = "orchestrator",
            query_hash = %hash,
            bm25_hits = outcome.bm25_hits(),
            vector_hits = outcome.vector_hits(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Retrieval complete"
        );

        Ok(outcome)
    }

    async fn run_path<F>(&self, path: RetrievalPath, limit: usize, fut: F) -> PathResult
    where
        F: Future<Output = sift_core::Result<Vec<RetrievalCandidate>>>,
    {
        let start = Instant::now();
        let result = match tokio::time::timeout(self.path_timeout, fut).await {
            Ok(Ok(candidates)) => Ok(sanitize(path, candidates, limit)),
            Ok(Err(e)) => Err(RetrievalError::path_failed(path, e.to_string())),
            Err(_) => Err(RetrievalError::path_failed(
                path,
                format!("timed out after {} ms", self.path_timeout.as_millis()),
            )),
        };
        debug!(
            subsystem = "search",
            component = "orchestrator",
            path = %path,
            ok = result.is_ok(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Retrieval path finished"
        );
        result
    }
}

/// Cap the list, drop duplicate ids (first wins) and clear the other path's score.
fn sanitize(
    path: RetrievalPath,
    candidates: Vec<RetrievalCandidate>,
    limit: usize,
) -> Vec<RetrievalCandidate> {
    let mut seen = std::collections::HashSet::new();
    candidates
        .into_iter()
        .filter(|c| seen.insert(c.chunk_id.clone()))
        .take(limit)
        .map(|mut c| {
            match path {
                RetrievalPath::Bm25 => c.raw_vector_score = None,
                RetrievalPath::Vector => c.raw_bm25_score = None,
            }
            c
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(id: &str, score: f32) -> RetrievalCandidate {
        RetrievalCandidate::new(id, format!("text {id}")).with_bm25_score(score)
    }

    fn vec_hit(id: &str, score: f32) -> RetrievalCandidate {
        RetrievalCandidate::new(id, format!("text {id}")).with_vector_score(score)
    }

    #[test]
    fn test_merge_unions_by_chunk_id() {
        let bm25 = vec![lex("a", 3.0), lex("b", 2.0)];
        let vector = vec![vec_hit("b", 0.9), vec_hit("c", 0.5)];
        let merged = merge_candidates([bm25.as_slice(), vector.as_slice()]);

        assert_eq!(merged.len(), 3);
        let b = merged.iter().find(|c| c.chunk_id == "b").unwrap();
        assert_eq!(b.raw_bm25_score, Some(2.0));
        assert_eq!(b.raw_vector_score, Some(0.9));
        let a = merged.iter().find(|c| c.chunk_id == "a").unwrap();
        assert!(a.raw_vector_score.is_none());
    }

    #[test]
    fn test_merge_commutative() {
        let bm25 = vec![lex("a", 3.0), lex("b", 2.0)];
        let vector = vec![vec_hit("b", 0.9), vec_hit("c", 0.5)];
        assert_eq!(
            merge_candidates([bm25.as_slice(), vector.as_slice()]),
            merge_candidates([vector.as_slice(), bm25.as_slice()])
        );
    }

    #[test]
    fn test_sanitize_caps_dedupes_and_clears_foreign_score() {
        let leaky = vec![
            lex("a", 3.0).with_vector_score(0.1),
            lex("a", 1.0),
            lex("b", 2.0),
            lex("c", 1.0),
        ];
        let out = sanitize(RetrievalPath::Bm25, leaky, 2);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].chunk_id, "a");
        assert_eq!(out[0].raw_bm25_score, Some(3.0));
        assert!(out[0].raw_vector_score.is_none());
        assert_eq!(out[1].chunk_id, "b");
    }

    #[test]
    fn test_outcome_failed_path() {
        let outcome = RetrievalOutcome {
            bm25: Err(RetrievalError::path_failed(RetrievalPath::Bm25, "down")),
            vector: Ok(vec![vec_hit("a", 0.5)]),
        };
        assert_eq!(outcome.failed_path(), Some(RetrievalPath::Bm25));
        assert_eq!(outcome.bm25_hits(), 0);
        assert_eq!(outcome.vector_hits(), 1);
        assert_eq!(outcome.merged().len(), 1);
    }
}
