//! Default prompt templates used the first time a user's pipeline is
//! created (spec §4.1 PipelineResolution). A user can later override these
//! via `Pipeline::rag_template` / `question_generation_template`; nothing in
//! this crate depends on the exact wording.

use ragcore_core::PromptTemplate;

pub fn default_rag_template() -> PromptTemplate {
    PromptTemplate {
        name: "default_rag".to_string(),
        template: "Answer the question using only the context below. \
                   If the context doesn't contain the answer, say so.\n\n\
                   Context:\n{context}\n\nQuestion: {question}"
            .to_string(),
    }
}

pub fn default_question_generation_template() -> PromptTemplate {
    PromptTemplate {
        name: "default_question_generation".to_string(),
        template: "Given the conversation history below, rewrite the follow-up \
                   question as a standalone question.\n\nHistory:\n{history}\n\n\
                   Follow-up question: {question}"
            .to_string(),
    }
}
