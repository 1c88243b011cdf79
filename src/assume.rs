//! Requirement → retrieval → assumptions/gaps draft.

use anyhow::Result;
use serde::Serialize;

use designpack_rag_core::store::PayloadFilter;

use crate::generate::{complete, Generator};
use crate::prompt::{
    assumptions_user_prompt, build_query, parse_requirement, ASSUMPTIONS_SYSTEM_PROMPT,
    ASSUMPTIONS_UNAVAILABLE,
};
use crate::retriever::Retriever;

#[derive(Debug, Clone, Serialize)]
pub struct AssumptionDraft {
    pub query: String,
    pub context: String,
    pub assumptions: String,
}

/// Retrieval filter restricting hits to one module.
pub fn module_filter(module: &str) -> PayloadFilter {
    let mut filter = PayloadFilter::new();
    filter.insert("module".to_string(), module.to_string());
    filter
}

/// Draft assumptions for a YAML requirement.
///
/// Only an unparseable requirement is an error. Retrieval degrades to an
/// empty context and generation to its fallback text; with no usable
/// backend at all the placeholder text is returned. `max_tokens` comes
/// from `generation.max_tokens`.
pub async fn draft_assumptions(
    retriever: &Retriever,
    generator: &dyn Generator,
    module: &str,
    requirement_yaml: &str,
    k: Option<usize>,
    max_tokens: u32,
) -> Result<AssumptionDraft> {
    let requirement = parse_requirement(requirement_yaml)?;
    let query = build_query(module, &requirement);
    let k = k.unwrap_or_else(|| retriever.default_k());
    let context = retriever
        .build_context(&query, k, &module_filter(module))
        .await;
    tracing::debug!(%query, k, context_chars = context.len(), "context assembled");

    let assumptions = if generator.available() {
        let user = assumptions_user_prompt(requirement_yaml, &context);
        complete(generator, ASSUMPTIONS_SYSTEM_PROMPT, &user, max_tokens)
            .await
            .trim()
            .to_string()
    } else {
        String::new()
    };

    Ok(AssumptionDraft {
        query,
        context,
        assumptions: if assumptions.is_empty() {
            ASSUMPTIONS_UNAVAILABLE.to_string()
        } else {
            assumptions
        },
    })
}
