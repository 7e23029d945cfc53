//! In-memory BM25 keyword index over the chunk corpus
//!
//! The index is immutable once built. Ingestion constructs a fresh
//! index from the full corpus and swaps it in atomically, so queries
//! never observe a half-built index.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use unicode_segmentation::UnicodeSegmentation;
use uuid::Uuid;

use crate::config::RetrievalConfig;
use crate::types::{Chunk, RetrievalSource, RetrievedChunk};

/// BM25 scoring parameters
#[derive(Debug, Clone, Copy)]
pub struct Bm25Params {
    /// Term frequency saturation
    pub k1: f32,
    /// Length normalization strength
    pub b: f32,
}

impl From<&RetrievalConfig> for Bm25Params {
    fn from(config: &RetrievalConfig) -> Self {
        Self {
            k1: config.bm25_k1,
            b: config.bm25_b,
        }
    }
}

impl Default for Bm25Params {
    fn default() -> Self {
        Self { k1: 1.2, b: 0.75 }
    }
}

/// Tokenize text into lowercase word terms
///
/// Unicode word boundaries, so "TCP/IP stack" yields ["tcp", "ip", "stack"].
pub fn tokenize(text: &str) -> Vec<String> {
    text.unicode_words()
        .map(|w| w.to_lowercase())
        .collect()
}

/// Per-chunk posting data
struct DocEntry {
    chunk: Chunk,
    length: usize,
}

/// Immutable BM25 index built from a corpus snapshot
pub struct Bm25Index {
    params: Bm25Params,
    /// term -> (doc position, term frequency)
    postings: HashMap<String, Vec<(usize, u32)>>,
    docs: Vec<DocEntry>,
    by_id: HashMap<Uuid, usize>,
    avg_doc_len: f32,
}

impl Bm25Index {
    /// Build an index over the given chunks
    pub fn build(chunks: &[Chunk], params: Bm25Params) -> Self {
        let mut postings: HashMap<String, Vec<(usize, u32)>> = HashMap::new();
        let mut docs = Vec::with_capacity(chunks.len());
        let mut by_id = HashMap::with_capacity(chunks.len());
        let mut total_len = 0usize;

        for (pos, chunk) in chunks.iter().enumerate() {
            let terms = tokenize(&chunk.content);
            let length = terms.len();
            total_len += length;

            let mut freqs: HashMap<String, u32> = HashMap::new();
            for term in terms {
                *freqs.entry(term).or_insert(0) += 1;
            }
            for (term, tf) in freqs {
                postings.entry(term).or_default().push((pos, tf));
            }

            by_id.insert(chunk.id, pos);
            docs.push(DocEntry {
                chunk: chunk.clone(),
                length,
            });
        }

        let avg_doc_len = if docs.is_empty() {
            0.0
        } else {
            total_len as f32 / docs.len() as f32
        };

        Self {
            params,
            postings,
            docs,
            by_id,
            avg_doc_len,
        }
    }

    /// Number of indexed chunks
    pub fn len(&self) -> usize {
        self.docs.len()
    }

    /// Whether the index holds no chunks
    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    /// Look up an indexed chunk by id
    pub fn get(&self, id: &Uuid) -> Option<&Chunk> {
        self.by_id.get(id).map(|&pos| &self.docs[pos].chunk)
    }

    /// Search the index, returning the top-k chunks by BM25 score
    ///
    /// An empty or all-stopword query returns no results rather than
    /// the whole corpus. Ties break on corpus order for stability.
    pub fn search(&self, query: &str, top_k: usize) -> Vec<RetrievedChunk> {
        let terms = tokenize(query);
        if terms.is_empty() || self.docs.is_empty() || top_k == 0 {
            return Vec::new();
        }

        let n = self.docs.len() as f32;
        let mut scores: HashMap<usize, f32> = HashMap::new();

        for term in &terms {
            let Some(posting) = self.postings.get(term) else {
                continue;
            };
            let df = posting.len() as f32;
            let idf = ((n - df + 0.5) / (df + 0.5) + 1.0).ln();

            for &(pos, tf) in posting {
                let doc_len = self.docs[pos].length as f32;
                let tf = tf as f32;
                let norm = self.params.k1
                    * (1.0 - self.params.b + self.params.b * doc_len / self.avg_doc_len);
                let contribution = idf * (tf * (self.params.k1 + 1.0)) / (tf + norm);
                *scores.entry(pos).or_insert(0.0) += contribution;
            }
        }

        let mut ranked: Vec<(usize, f32)> = scores.into_iter().collect();
        ranked.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        ranked.truncate(top_k);

        ranked
            .into_iter()
            .map(|(pos, score)| RetrievedChunk {
                chunk: self.docs[pos].chunk.clone(),
                score,
                source: RetrievalSource::Keyword,
            })
            .collect()
    }
}

/// Shared handle to the current index snapshot
///
/// Readers clone the inner `Arc` under a brief read lock; ingestion
/// replaces the whole snapshot under a write lock.
#[derive(Clone)]
pub struct SharedIndex {
    inner: Arc<RwLock<Arc<Bm25Index>>>,
}

impl SharedIndex {
    /// Start with an empty index
    pub fn empty(params: Bm25Params) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(Bm25Index::build(&[], params)))),
        }
    }

    /// Current snapshot
    pub fn snapshot(&self) -> Arc<Bm25Index> {
        self.inner.read().clone()
    }

    /// Atomically replace the snapshot
    pub fn swap(&self, index: Bm25Index) {
        *self.inner.write() = Arc::new(index);
    }
}
