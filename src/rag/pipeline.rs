//! Chat pipeline: history → retrieval → prompt → generation → history.

use std::sync::Arc;

use serde::Serialize;

use super::generator::AnswerGenerator;
use super::prompt::{contextual_input, PromptAssembler};
use super::retriever::Retriever;
use super::RagError;
use crate::core::config::RetrievalQuery;
use crate::history::{HistoryEntry, HistoryStore};

/// Result of one chat turn.
#[derive(Debug, Clone, Serialize)]
pub struct ChatTurn {
    pub answer: String,
    pub history: Vec<HistoryEntry>,
}

pub struct RagPipeline {
    retriever: Retriever,
    prompt: PromptAssembler,
    generator: Arc<dyn AnswerGenerator>,
    history: Arc<dyn HistoryStore>,
    retrieval_query: RetrievalQuery,
    fallback_answer: String,
}

impl RagPipeline {
    pub fn new(
        retriever: Retriever,
        prompt: PromptAssembler,
        generator: Arc<dyn AnswerGenerator>,
        history: Arc<dyn HistoryStore>,
    ) -> Self {
        Self {
            retriever,
            prompt,
            generator,
            history,
            retrieval_query: RetrievalQuery::default(),
            fallback_answer: crate::core::config::defaults::FALLBACK_ANSWER.to_string(),
        }
    }

    pub fn with_retrieval_query(mut self, retrieval_query: RetrievalQuery) -> Self {
        self.retrieval_query = retrieval_query;
        self
    }

    pub fn with_fallback_answer(mut self, fallback_answer: impl Into<String>) -> Self {
        self.fallback_answer = fallback_answer.into();
        self
    }

    /// Answers `message` in the context of the session's conversation and
    /// records the turn. History is untouched unless generation succeeds.
    pub async fn answer(&self, session: &str, message: &str) -> Result<ChatTurn, RagError> {
        let message = non_empty(message)?;

        let history = self.history.get(session).await?;
        let input = contextual_input(&history, message);
        let query = match self.retrieval_query {
            RetrievalQuery::Message => message,
            RetrievalQuery::Conversation => input.as_str(),
        };

        let answer = self.generate(query, &input).await?;
        let history = self.history.append_turn(session, message, &answer).await?;
        tracing::debug!("Session history now holds {} entries", history.len());

        Ok(ChatTurn { answer, history })
    }

    /// Single question without conversation memory.
    pub async fn answer_once(&self, message: &str) -> Result<String, RagError> {
        let message = non_empty(message)?;
        self.generate(message, message).await
    }

    pub async fn history(&self, session: &str) -> Result<Vec<HistoryEntry>, RagError> {
        self.history.get(session).await
    }

    pub async fn clear(&self, session: &str) -> Result<(), RagError> {
        self.history.clear(session).await
    }

    async fn generate(&self, query: &str, input: &str) -> Result<String, RagError> {
        let documents = self.retriever.retrieve(query).await?;
        let messages = self.prompt.assemble(&documents, input);

        match self.generator.generate(messages).await? {
            Some(answer) => Ok(answer),
            None => {
                tracing::warn!("Model returned no answer text; using fallback");
                Ok(self.fallback_answer.clone())
            }
        }
    }
}

fn non_empty(message: &str) -> Result<&str, RagError> {
    let trimmed = message.trim();
    if trimmed.is_empty() {
        Err(RagError::EmptyMessage)
    } else {
        Ok(trimmed)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::history::{MemoryHistoryStore, Role, HISTORY_LIMIT};
    use crate::rag::embedding::Embedder;
    use crate::rag::generator::ChatMessage;
    use crate::rag::index::{IndexRecord, InMemoryIndex, VectorIndex};

    /// Records the queries it embeds; every text maps to the same vector.
    #[derive(Default)]
    struct RecordingEmbedder {
        queries: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Embedder for RecordingEmbedder {
        fn dimension(&self) -> usize {
            2
        }

        async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
            self.queries
                .lock()
                .map_err(RagError::embedding)?
                .extend(texts.iter().cloned());
            Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
        }
    }

    enum Reply {
        Echo,
        Nothing,
        Fail,
    }

    struct ScriptedGenerator {
        reply: Reply,
        seen: Mutex<Vec<Vec<ChatMessage>>>,
    }

    impl ScriptedGenerator {
        fn new(reply: Reply) -> Self {
            Self {
                reply,
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl AnswerGenerator for ScriptedGenerator {
        async fn generate(&self, messages: Vec<ChatMessage>) -> Result<Option<String>, RagError> {
            let last = messages.last().map(|m| m.content.clone()).unwrap_or_default();
            self.seen.lock().map_err(RagError::generation)?.push(messages);
            match self.reply {
                Reply::Echo => Ok(Some(format!("answer to [{}]", last.lines().last().unwrap_or("")))),
                Reply::Nothing => Ok(None),
                Reply::Fail => Err(RagError::Generation("503 Service Unavailable".to_string())),
            }
        }
    }

    struct Fixture {
        pipeline: RagPipeline,
        embedder: Arc<RecordingEmbedder>,
        generator: Arc<ScriptedGenerator>,
        history: Arc<MemoryHistoryStore>,
    }

    async fn fixture(reply: Reply, retrieval_query: RetrievalQuery) -> Fixture {
        let embedder = Arc::new(RecordingEmbedder::default());
        let index = Arc::new(InMemoryIndex::new());
        index
            .upsert(vec![IndexRecord {
                id: "0".to_string(),
                values: vec![1.0, 0.0],
                text: "Migraines are recurring headaches.".to_string(),
                source: "Data/medical_book.pdf".to_string(),
            }])
            .await
            .expect("upsert");
        let generator = Arc::new(ScriptedGenerator::new(reply));
        let history = Arc::new(MemoryHistoryStore::new());

        let pipeline = RagPipeline::new(
            Retriever::new(embedder.clone(), index),
            PromptAssembler::new("Use this context:\n{context}"),
            generator.clone(),
            history.clone(),
        )
        .with_retrieval_query(retrieval_query);

        Fixture {
            pipeline,
            embedder,
            generator,
            history,
        }
    }

    #[tokio::test]
    async fn answer_records_the_turn() {
        let f = fixture(Reply::Echo, RetrievalQuery::Message).await;

        let turn = f.pipeline.answer("s", "  What is a migraine?  ").await.expect("answer");

        assert_eq!(turn.answer, "answer to [User: What is a migraine?]");
        assert_eq!(
            turn.history,
            vec![
                HistoryEntry::new(Role::User, "What is a migraine?"),
                HistoryEntry::new(Role::Assistant, "answer to [User: What is a migraine?]"),
            ]
        );

        let seen = f.generator.seen.lock().expect("lock");
        assert!(seen[0][0].content.contains("Migraines are recurring headaches."));
    }

    #[tokio::test]
    async fn history_is_bounded_after_many_turns() {
        let f = fixture(Reply::Echo, RetrievalQuery::Message).await;
        for i in 0..8 {
            let turn = f.pipeline.answer("s", &format!("question {}", i)).await.expect("answer");
            assert_eq!(turn.history.len(), (2 * (i + 1)).min(HISTORY_LIMIT));
        }
    }

    #[tokio::test]
    async fn llm_input_carries_prior_turns() {
        let f = fixture(Reply::Echo, RetrievalQuery::Message).await;
        f.pipeline.answer("s", "I have a headache").await.expect("first");
        f.pipeline.answer("s", "Since yesterday").await.expect("second");

        let seen = f.generator.seen.lock().expect("lock");
        let input = &seen[1][1].content;
        assert!(input.starts_with("Conversation so far:\nuser: I have a headache\nassistant: "));
        assert!(input.ends_with("\n\nUser: Since yesterday"));
    }

    #[tokio::test]
    async fn retrieval_query_follows_policy() {
        let by_message = fixture(Reply::Echo, RetrievalQuery::Message).await;
        by_message.pipeline.answer("s", "dizzy").await.expect("answer");
        assert_eq!(*by_message.embedder.queries.lock().expect("lock"), vec!["dizzy".to_string()]);

        let by_conversation = fixture(Reply::Echo, RetrievalQuery::Conversation).await;
        by_conversation.pipeline.answer("s", "dizzy").await.expect("answer");
        let queries = by_conversation.embedder.queries.lock().expect("lock");
        assert_eq!(queries[0], "Conversation so far:\n\n\nUser: dizzy");
    }

    #[tokio::test]
    async fn empty_message_is_rejected_without_side_effects() {
        let f = fixture(Reply::Echo, RetrievalQuery::Message).await;

        let err = f.pipeline.answer("s", "   ").await.unwrap_err();

        assert!(matches!(err, RagError::EmptyMessage));
        assert!(f.history.get("s").await.expect("get").is_empty());
        assert!(f.embedder.queries.lock().expect("lock").is_empty());
    }

    #[tokio::test]
    async fn generation_failure_leaves_history_unchanged() {
        let f = fixture(Reply::Fail, RetrievalQuery::Message).await;
        f.history.append_turn("s", "earlier", "reply").await.expect("seed");

        let err = f.pipeline.answer("s", "new question").await.unwrap_err();

        assert!(matches!(err, RagError::Generation(_)));
        assert_eq!(f.history.get("s").await.expect("get").len(), 2);
    }

    #[tokio::test]
    async fn missing_answer_uses_fallback() {
        let f = fixture(Reply::Nothing, RetrievalQuery::Message).await;

        let turn = f.pipeline.answer("s", "hello").await.expect("answer");

        assert_eq!(turn.answer, "Sorry, I could not generate an answer.");
        assert_eq!(turn.history[1].content, turn.answer);
    }

    #[tokio::test]
    async fn answer_once_ignores_history() {
        let f = fixture(Reply::Echo, RetrievalQuery::Message).await;
        f.pipeline.answer("s", "remember me").await.expect("answer");

        let answer = f.pipeline.answer_once("What is acne?").await.expect("answer");

        assert_eq!(answer, "answer to [What is acne?]");
        let seen = f.generator.seen.lock().expect("lock");
        assert_eq!(seen[1][1].content, "What is acne?");
        assert_eq!(f.history.get("s").await.expect("get").len(), 2);
    }

    #[tokio::test]
    async fn clear_resets_the_session() {
        let f = fixture(Reply::Echo, RetrievalQuery::Message).await;
        f.pipeline.answer("s", "one").await.expect("answer");
        f.pipeline.clear("s").await.expect("clear");

        let turn = f.pipeline.answer("s", "hi").await.expect("answer");
        assert_eq!(turn.history.len(), 2);
    }
}
