//! Weighted score fusion of keyword and vector retrieval channels

use std::collections::HashMap;

use uuid::Uuid;

use crate::config::FusionWeights;
use crate::types::{RetrievalSource, RetrievedChunk};

/// Min-max normalize scores in place
///
/// A degenerate list where every score is equal normalizes to all 1.0,
/// so a single-result channel still contributes its full weight.
fn normalize(results: &mut [RetrievedChunk]) {
    let Some(first) = results.first() else {
        return;
    };
    let mut min = first.score;
    let mut max = first.score;
    for r in results.iter() {
        min = min.min(r.score);
        max = max.max(r.score);
    }

    let range = max - min;
    for r in results.iter_mut() {
        r.score = if range > f32::EPSILON {
            (r.score - min) / range
        } else {
            1.0
        };
    }
}

/// Fuse two ranked lists into one, deduplicated by chunk id
///
/// Each list is min-max normalized independently, then combined as
/// `w_kw * keyword + w_vec * vector` with a missing component scoring
/// zero. No chunk present in either input is ever dropped. Ties break
/// on first-appearance order (keyword list first), so fusion is
/// deterministic for a given pair of inputs.
pub fn fuse(
    mut keyword: Vec<RetrievedChunk>,
    mut vector: Vec<RetrievedChunk>,
    weights: &FusionWeights,
) -> Vec<RetrievedChunk> {
    normalize(&mut keyword);
    normalize(&mut vector);

    struct Entry {
        result: RetrievedChunk,
        order: usize,
    }

    let mut merged: HashMap<Uuid, Entry> = HashMap::new();
    let mut order = 0usize;

    for r in keyword {
        let id = r.chunk.id;
        merged.insert(
            id,
            Entry {
                result: RetrievedChunk {
                    chunk: r.chunk,
                    score: weights.keyword * r.score,
                    source: RetrievalSource::Fused,
                },
                order,
            },
        );
        order += 1;
    }

    for r in vector {
        let weighted = weights.vector * r.score;
        match merged.get_mut(&r.chunk.id) {
            Some(entry) => entry.result.score += weighted,
            None => {
                merged.insert(
                    r.chunk.id,
                    Entry {
                        result: RetrievedChunk {
                            chunk: r.chunk,
                            score: weighted,
                            source: RetrievalSource::Fused,
                        },
                        order,
                    },
                );
                order += 1;
            }
        }
    }

    let mut fused: Vec<Entry> = merged.into_values().collect();
    fused.sort_by(|a, b| {
        b.result
            .score
            .partial_cmp(&a.result.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.order.cmp(&b.order))
    });

    fused.into_iter().map(|e| e.result).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Chunk;

    fn hit(id: Uuid, score: f32, source: RetrievalSource) -> RetrievedChunk {
        RetrievedChunk {
            chunk: Chunk {
                id,
                document_id: Uuid::new_v4(),
                filename: "doc.txt".to_string(),
                chunk_index: 0,
                content: "content".to_string(),
            },
            score,
            source,
        }
    }

    fn weights() -> FusionWeights {
        FusionWeights {
            keyword: 0.4,
            vector: 0.6,
        }
    }

    #[test]
    fn chunk_in_both_channels_outranks_single_channel() {
        let shared = Uuid::new_v4();
        let kw_only = Uuid::new_v4();
        let vec_only = Uuid::new_v4();

        let keyword = vec![
            hit(shared, 8.0, RetrievalSource::Keyword),
            hit(kw_only, 7.0, RetrievalSource::Keyword),
        ];
        let vector = vec![
            hit(shared, 0.9, RetrievalSource::Vector),
            hit(vec_only, 0.5, RetrievalSource::Vector),
        ];

        let fused = fuse(keyword, vector, &weights());
        assert_eq!(fused.len(), 3);
        assert_eq!(fused[0].chunk.id, shared);
        assert!(fused.iter().all(|r| r.source == RetrievalSource::Fused));
    }

    #[test]
    fn no_input_chunk_is_dropped() {
        let keyword: Vec<_> = (0..5)
            .map(|i| hit(Uuid::new_v4(), i as f32, RetrievalSource::Keyword))
            .collect();
        let vector: Vec<_> = (0..3)
            .map(|i| hit(Uuid::new_v4(), i as f32, RetrievalSource::Vector))
            .collect();

        let fused = fuse(keyword, vector, &weights());
        assert_eq!(fused.len(), 8);
    }

    #[test]
    fn fusion_is_insensitive_to_input_order() {
        let shared = Uuid::new_v4();
        let ids: Vec<Uuid> = (0..3).map(|_| Uuid::new_v4()).collect();
        let keyword = vec![
            hit(ids[0], 3.0, RetrievalSource::Keyword),
            hit(shared, 2.5, RetrievalSource::Keyword),
            hit(ids[1], 2.0, RetrievalSource::Keyword),
        ];
        let vector = vec![
            hit(ids[2], 0.8, RetrievalSource::Vector),
            hit(shared, 0.6, RetrievalSource::Vector),
        ];

        let forward = fuse(keyword.clone(), vector.clone(), &weights());
        let mut kw_rev = keyword;
        kw_rev.reverse();
        let mut vec_rev = vector;
        vec_rev.reverse();
        let reversed = fuse(kw_rev, vec_rev, &weights());

        // Scores are attached per element and min-max is permutation
        // invariant, so shuffling within a channel changes nothing: the
        // same ids carry the same combined score and the same rank.
        assert_eq!(forward.len(), reversed.len());
        for (f, r) in forward.iter().zip(reversed.iter()) {
            assert_eq!(f.chunk.id, r.chunk.id);
            assert!((f.score - r.score).abs() < 1e-6);
        }
    }

    #[test]
    fn single_result_channel_normalizes_to_full_weight() {
        let id = Uuid::new_v4();
        let fused = fuse(
            vec![hit(id, 42.0, RetrievalSource::Keyword)],
            vec![],
            &weights(),
        );
        assert_eq!(fused.len(), 1);
        assert!((fused[0].score - 0.4).abs() < 1e-6);
    }

    #[test]
    fn empty_channels_fuse_to_empty() {
        assert!(fuse(vec![], vec![], &weights()).is_empty());
    }

    #[test]
    fn equal_scores_tie_break_on_first_appearance() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let keyword = vec![
            hit(a, 1.0, RetrievalSource::Keyword),
            hit(b, 1.0, RetrievalSource::Keyword),
        ];

        let fused = fuse(keyword, vec![], &weights());
        assert_eq!(fused[0].chunk.id, a);
        assert_eq!(fused[1].chunk.id, b);
    }
}
