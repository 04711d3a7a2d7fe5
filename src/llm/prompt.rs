//! Grounded answer prompt.

/// Placeholder replaced by the assembled context.
pub const CONTEXT_PLACEHOLDER: &str = "{context}";

/// Default instructions sent with every question.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful insurance assistant. Use the following context from insurance policy documents to answer user questions accurately and helpfully.

Context from policy documents:
{context}

Instructions:
- Answer questions based on the provided context
- If the context doesn't contain enough information, say so
- Be friendly, professional, and helpful
- Provide specific details when available
- If asked about coverage, deductibles, or claims, refer to the specific policy information
";

/// System prompt template with a `{context}` slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    template: String,
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self {
            template: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }
}

impl PromptTemplate {
    /// Use a custom template. A template without `{context}` gets the context
    /// appended under a heading.
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    /// Build the system prompt for one query.
    pub fn render(&self, context: &str) -> String {
        if self.template.contains(CONTEXT_PLACEHOLDER) {
            self.template.replace(CONTEXT_PLACEHOLDER, context)
        } else {
            format!(
                "{}\n\nContext from policy documents:\n{}\n",
                self.template.trim_end(),
                context
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_embeds_context() {
        let prompt = PromptTemplate::default().render("Context 1:\nDeductible 500 EUR\n");
        assert!(prompt.contains("Context from policy documents:\nContext 1:\nDeductible 500 EUR"));
        assert!(prompt.contains("say so"));
    }

    #[test]
    fn test_template_without_placeholder_appends_context() {
        let prompt = PromptTemplate::new("Answer briefly.").render("ctx");
        assert_eq!(prompt, "Answer briefly.\n\nContext from policy documents:\nctx\n");
    }
}
