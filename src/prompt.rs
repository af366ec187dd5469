//! Chat prompt composition.
//!
//! Builds the single text payload sent to the completion service: the
//! Sahayaka Mitra persona and its answering rules, the scheme knowledge text
//! embedded verbatim, then the user's question embedded verbatim.
//!
//! Neither the knowledge text nor the question is escaped or sanitized — the
//! composed string is opaque payload for the provider, and prompt injection
//! is an accepted limitation of this design.

use crate::error::PortalError;

/// Persona and rules preamble, up to the knowledge section.
const PERSONA_RULES: &str = r#"
You are 'Sahayaka Mitra' (ಸಹಾಯಕ ಮಿತ್ರ), a helpful AI chatbot for Indian farmers.
Your goal is to answer user questions about government agricultural schemes.

**RULES:**
1. Answer questions based ONLY on the information provided in the 'SCHEME INFORMATION' section below. Do not use any external knowledge.
2. Respond clearly and concisely in BOTH English and Kannada, regardless of the input language.
3. If the user's question is unclear or not related to the provided schemes, politely say you can only answer questions about the listed agricultural schemes.
4. If the user asks about topics outside agricultural schemes, politely inform them you can only assist with questions related to the provided schemes.
5. If the user needs help with other agricultural schemes, give them relevant details and how to apply by searching online.
6. Always encourage users to visit official government websites or contact local agricultural offices for the most accurate and up-to-date information.

---
**SCHEME INFORMATION:**
"#;

/// Bridge between the knowledge section and the question.
const QUESTION_LEAD: &str = r#"
---

Now, based on the rules and information above, answer the user's question.

User Question: "#;

/// Compose the full prompt for one chat exchange.
///
/// The two inserted strings are concatenated verbatim, never substituted
/// into or rescanned, so payload text that happens to look like a template
/// marker passes through untouched.
///
/// Fails fast rather than composing a degenerate prompt: an empty question
/// is `MissingInput`, an empty knowledge text is `DataUnavailable`.
pub fn compose(knowledge_text: &str, question: &str) -> Result<String, PortalError> {
    if question.is_empty() {
        return Err(PortalError::MissingInput);
    }
    if knowledge_text.is_empty() {
        return Err(PortalError::DataUnavailable);
    }

    Ok(format!(
        "{PERSONA_RULES}{knowledge_text}{QUESTION_LEAD}{question}\n"
    ))
}
