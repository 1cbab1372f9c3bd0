//! Prompt templates for retrieval-augmented answers

use crate::types::{truncate_chars, Document, Message};

/// Prompt builder for grounded Q&A
pub struct PromptBuilder;

impl PromptBuilder {
    /// Render conversational history as `ROLE: content` lines.
    ///
    /// Callers pass pre-filtered messages; system messages never appear in
    /// rendered history.
    pub fn render_history(messages: &[Message]) -> String {
        messages
            .iter()
            .map(|m| format!("{}: {}", m.role.as_str().to_uppercase(), m.content))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Render document metadata for the system instruction.
    pub fn document_context(document: &Document) -> String {
        let mut context = format!("Document: {}\n", document.display_title());
        if let Some(summary) = &document.summary {
            context.push_str(&format!("Summary: {}\n", summary));
        }
        if !document.keywords.is_empty() {
            context.push_str(&format!("Keywords: {}\n", document.keywords.join(", ")));
        }
        if let Some(text) = document.extracted_text.as_deref().filter(|t| !t.is_empty()) {
            context.push_str(&format!("Content preview: {}\n", truncate_chars(text, 500)));
        }
        context
    }

    /// Seed content of the SYSTEM message created when a conversation is
    /// bound to a document.
    pub fn seed_message(document: &Document) -> String {
        Self::document_context(document)
    }

    /// Title for an auto-created document conversation.
    pub fn conversation_title(document: &Document) -> String {
        format!("Chat about {}", document.original_name)
    }

    /// Build the grounded system instruction from document metadata,
    /// retrieved context, and rendered history.
    ///
    /// The prompt is always sent, even with empty context; the instruction
    /// tells the model to say so when the supplied material is insufficient.
    pub fn build_system_prompt(
        document_context: Option<&str>,
        context: &str,
        history: &str,
    ) -> String {
        let mut prompt = String::from(
            "You are an intelligent document assistant. Answer questions using ONLY the \
             document information, relevant content, and conversation history provided below. \
             If the provided material does not contain the answer, clearly state that the \
             information is not available. Do not use external knowledge.\n",
        );

        if let Some(doc) = document_context {
            prompt.push_str(&format!("\nDOCUMENT INFORMATION:\n{}\n", doc));
        }

        prompt.push_str(&format!(
            "\nRELEVANT CONTENT:\n{}\n",
            if context.is_empty() {
                "No specific relevant content found."
            } else {
                context
            }
        ));

        if !history.is_empty() {
            prompt.push_str(&format!("\nCONVERSATION HISTORY:\n{}\n", history));
        }

        prompt
    }

    /// Prompt asking the model to structure raw document text as JSON.
    pub fn build_structure_prompt(raw_text: &str) -> String {
        format!(
            r#"Analyze the following document text and return a JSON object with exactly these fields:
- "title": a concise document title
- "summary": a 2-3 sentence summary
- "keywords": an array of 3-8 keyword strings
- "sections": an array of {{"heading", "content"}} objects outlining the document

Return ONLY the JSON object, no surrounding prose or code fences.

DOCUMENT TEXT:
{}"#,
            truncate_chars(raw_text, 6000)
        )
    }
}
