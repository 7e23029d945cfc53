//! Citation extraction and linking

use regex::Regex;

use crate::types::Citation;

/// Extract `[Source: filename, chunk N]` markers from the answer and link
/// them to the retrieved context.
///
/// When the model cited nothing explicitly, the top citations by score are
/// attached instead and listed at the end of the answer, so a completed run
/// always carries its provenance.
pub fn extract_and_link_citations(
    answer: &str,
    available: &mut Vec<Citation>,
) -> (String, Vec<Citation>) {
    let citation_pattern = Regex::new(r"\[Source:\s*([^,\]]+)(?:,\s*chunk\s*(\d+))?\]")
        .expect("Invalid regex");

    let mut linked: Vec<Citation> = Vec::new();
    let mut clean_answer = answer.to_string();

    for cap in citation_pattern.captures_iter(answer) {
        let filename = cap.get(1).map(|m| m.as_str().trim()).unwrap_or("");
        let chunk_index: Option<u32> = cap.get(2).and_then(|m| m.as_str().parse().ok());

        if let Some(citation) = find_matching_citation(available, filename, chunk_index) {
            if !linked.iter().any(|c| c.chunk_id == citation.chunk_id) {
                linked.push(citation);
            }
        }
    }

    // No explicit markers: attach the strongest context instead
    if linked.is_empty() && !available.is_empty() {
        available.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        linked.extend(available.iter().take(3).cloned());

        clean_answer.push_str("\n\nSources used:");
        for citation in &linked {
            clean_answer.push_str(&format!("\n- {}", citation.format_inline()));
        }
    }

    (clean_answer, linked)
}

/// Find the citation matching a marker's filename and optional chunk index
fn find_matching_citation(
    citations: &[Citation],
    filename: &str,
    chunk_index: Option<u32>,
) -> Option<Citation> {
    for citation in citations {
        let filename_matches = citation.filename.eq_ignore_ascii_case(filename)
            || citation.filename.contains(filename)
            || filename.contains(&citation.filename);

        if filename_matches {
            match chunk_index {
                Some(idx) if citation.chunk_index == idx => return Some(citation.clone()),
                Some(_) => continue,
                None => return Some(citation.clone()),
            }
        }
    }

    // Marker named a chunk the context doesn't have: fall back to any
    // chunk of the same file
    citations
        .iter()
        .find(|c| c.filename.contains(filename) || filename.contains(&c.filename))
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn citation(filename: &str, chunk_index: u32, score: f32) -> Citation {
        Citation {
            chunk_id: Uuid::new_v4(),
            document_id: Uuid::new_v4(),
            filename: filename.to_string(),
            chunk_index,
            snippet: "snippet".to_string(),
            score,
        }
    }

    #[test]
    fn explicit_markers_link_to_their_chunks() {
        let mut available = vec![
            citation("physics.txt", 0, 0.9),
            citation("physics.txt", 1, 0.8),
            citation("biology.txt", 0, 0.7),
        ];

        let (answer, linked) = extract_and_link_citations(
            "Gravity attracts bodies [Source: physics.txt, chunk 1].",
            &mut available,
        );

        assert_eq!(linked.len(), 1);
        assert_eq!(linked[0].filename, "physics.txt");
        assert_eq!(linked[0].chunk_index, 1);
        assert!(!answer.contains("Sources used:"));
    }

    #[test]
    fn duplicate_markers_link_once() {
        let mut available = vec![citation("physics.txt", 0, 0.9)];

        let (_answer, linked) = extract_and_link_citations(
            "Fact one [Source: physics.txt, chunk 0]. Fact two [Source: physics.txt, chunk 0].",
            &mut available,
        );

        assert_eq!(linked.len(), 1);
    }

    #[test]
    fn uncited_answer_gets_top_scoring_sources_appended() {
        let mut available = vec![
            citation("a.txt", 0, 0.2),
            citation("b.txt", 0, 0.9),
            citation("c.txt", 0, 0.5),
            citation("d.txt", 0, 0.7),
        ];

        let (answer, linked) =
            extract_and_link_citations("An answer with no markers.", &mut available);

        assert_eq!(linked.len(), 3);
        assert_eq!(linked[0].filename, "b.txt");
        assert!(answer.contains("Sources used:"));
        assert!(answer.contains("b.txt (chunk 0)"));
    }

    #[test]
    fn marker_without_chunk_index_matches_by_filename() {
        let mut available = vec![citation("notes.txt", 4, 0.6)];

        let (_answer, linked) =
            extract_and_link_citations("Cited loosely [Source: notes.txt].", &mut available);

        assert_eq!(linked.len(), 1);
        assert_eq!(linked[0].chunk_index, 4);
    }

    #[test]
    fn no_context_means_no_citations() {
        let mut available = Vec::new();
        let (answer, linked) = extract_and_link_citations("Bare answer.", &mut available);
        assert!(linked.is_empty());
        assert_eq!(answer, "Bare answer.");
    }
}
