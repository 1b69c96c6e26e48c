//! Prompt templates for RAG generation

use crate::retrieval::ScoredChunk;
use crate::types::ChunkSource;

/// Prompt builder for Siegel questions
pub struct PromptBuilder;

impl PromptBuilder {
    /// Build context from ranked search results
    pub fn build_context(results: &[ScoredChunk]) -> String {
        let mut context = String::new();

        for (i, result) in results.iter().enumerate() {
            context.push_str(&format!(
                "[{}] {}\n\n{}\n\n---\n\n",
                i + 1,
                Self::format_source_ref(&result.chunk.source),
                result.chunk.content
            ));
        }

        context
    }

    /// Format source reference for context
    fn format_source_ref(source: &ChunkSource) -> String {
        match &source.section_title {
            Some(section) => format!("{} (Abschnitt: {})", source.document_id, section),
            None => source.document_id.clone(),
        }
    }

    /// Build the full RAG prompt
    pub fn build_rag_prompt(question: &str, context: &str) -> String {
        format!(
            r#"Du bist ein Experte für das Siegel-Erstellungssystem. Beantworte Fragen basierend auf dem bereitgestellten Kontext über die Erstellung von Stadtsiegeln.

Kontext:
{context}
Frage: {question}

Anweisungen:
- Antworte auf Deutsch
- Verwende nur Informationen aus dem bereitgestellten Kontext
- Sei präzise und hilfreich
- Wenn du die Antwort nicht weißt, sage es ehrlich
- Gib konkrete Schritte und Beispiele, wenn möglich
- Beziehe dich auf die Siegel-Komponenten und deren Verwendung

Antwort:"#,
            context = context,
            question = question.trim()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Chunk, SourceType};

    #[test]
    fn test_context_labels_ranked_chunks() {
        let source = ChunkSource {
            document_id: "information/guide.md".into(),
            source_type: SourceType::Guide,
            title: None,
            section_title: Some("Population Frame".into()),
        };
        let results = vec![
            ScoredChunk {
                chunk: Chunk::new(source.clone(), "green spikes".into(), 0, 12, 0),
                score: 0.9,
            },
            ScoredChunk {
                chunk: Chunk::new(
                    ChunkSource {
                        section_title: None,
                        ..source
                    },
                    "colours".into(),
                    12,
                    19,
                    1,
                ),
                score: 0.5,
            },
        ];

        let context = PromptBuilder::build_context(&results);
        assert!(context.starts_with("[1] information/guide.md (Abschnitt: Population Frame)\n\ngreen spikes"));
        assert!(context.contains("[2] information/guide.md\n\ncolours"));

        let prompt = PromptBuilder::build_rag_prompt(" Welche Farbe? ", &context);
        assert!(prompt.contains("Frage: Welche Farbe?\n"));
        assert!(prompt.contains("Antworte auf Deutsch"));
        assert!(prompt.find("green spikes") < prompt.find("colours"));
    }
}
