//! Topic registry — ordered (topic → handler token) bindings.
//!
//! Handlers are identified by a `Copy` token type supplied by the
//! application (typically a small enum), not by stored closures: the
//! connection manager resolves a token and the composition root's
//! [`MessageDelegate`](crate::mqtt::MessageDelegate) routes it to the
//! owning task. This keeps all task state in the explicit ownership
//! tree with no back-references held by the registry.
//!
//! Bindings are **prepended**, so traversal order is most-recently-
//! registered-first. Duplicate topics are permitted and shadow in that
//! order. Resubscription after a reconnect iterates the same order, so
//! the node's log output is reproducible across reconnects.

use crate::error::RegistryError;

/// Maximum number of topic bindings per node.
pub const MAX_BINDINGS: usize = 16;
/// Maximum topic string length in bytes.
pub const MAX_TOPIC_LEN: usize = 64;

/// One (topic, handler token) pair.
#[derive(Debug, Clone)]
struct TopicBinding<H> {
    topic: heapless::String<MAX_TOPIC_LEN>,
    handler: H,
}

/// Fixed-capacity registry of topic bindings.
#[derive(Debug, Clone)]
pub struct TopicRegistry<H: Copy> {
    bindings: heapless::Vec<TopicBinding<H>, MAX_BINDINGS>,
}

impl<H: Copy> TopicRegistry<H> {
    pub fn new() -> Self {
        Self {
            bindings: heapless::Vec::new(),
        }
    }

    /// Register a binding. May be called before any connection exists;
    /// the connection manager replays all bindings as subscriptions on
    /// every successful (re)connect.
    pub fn subscribe(&mut self, topic: &str, handler: H) -> Result<(), RegistryError> {
        let mut stored: heapless::String<MAX_TOPIC_LEN> = heapless::String::new();
        stored
            .push_str(topic)
            .map_err(|()| RegistryError::TopicTooLong)?;

        self.bindings
            .insert(
                0,
                TopicBinding {
                    topic: stored,
                    handler,
                },
            )
            .map_err(|_| RegistryError::Full)
    }

    /// Resolve a topic to the first matching handler token
    /// (most-recently-registered wins). Exact string match only.
    pub fn resolve(&self, topic: &str) -> Option<H> {
        self.bindings
            .iter()
            .find(|b| b.topic.as_str() == topic)
            .map(|b| b.handler)
    }

    /// All bound topics in prepend order, for the resubscribe loop.
    pub fn topics(&self) -> impl Iterator<Item = &str> {
        self.bindings.iter().map(|b| b.topic.as_str())
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl<H: Copy> Default for TopicRegistry<H> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Token {
        A1,
        B,
        A2,
    }

    #[test]
    fn resolves_exact_match_only() {
        let mut reg: TopicRegistry<Token> = TopicRegistry::new();
        reg.subscribe("door/config", Token::A1).unwrap();
        assert_eq!(reg.resolve("door/config"), Some(Token::A1));
        assert_eq!(reg.resolve("door/conf"), None);
        assert_eq!(reg.resolve("door/config/extra"), None);
    }

    #[test]
    fn duplicate_topic_shadows_most_recent_first() {
        let mut reg: TopicRegistry<Token> = TopicRegistry::new();
        reg.subscribe("a", Token::A1).unwrap();
        reg.subscribe("b", Token::B).unwrap();
        reg.subscribe("a", Token::A2).unwrap();

        assert_eq!(reg.resolve("a"), Some(Token::A2));
        assert_eq!(reg.resolve("b"), Some(Token::B));
    }

    #[test]
    fn topics_iterate_in_prepend_order() {
        let mut reg: TopicRegistry<Token> = TopicRegistry::new();
        reg.subscribe("a", Token::A1).unwrap();
        reg.subscribe("b", Token::B).unwrap();
        reg.subscribe("a", Token::A2).unwrap();

        let order: Vec<&str> = reg.topics().collect();
        assert_eq!(order, vec!["a", "b", "a"]);
    }

    #[test]
    fn rejects_overlong_topic() {
        let mut reg: TopicRegistry<Token> = TopicRegistry::new();
        let long = "t".repeat(MAX_TOPIC_LEN + 1);
        assert_eq!(
            reg.subscribe(&long, Token::A1),
            Err(RegistryError::TopicTooLong)
        );
        assert!(reg.is_empty());
    }

    #[test]
    fn rejects_registration_past_capacity() {
        let mut reg: TopicRegistry<Token> = TopicRegistry::new();
        for i in 0..MAX_BINDINGS {
            reg.subscribe(&format!("topic/{i}"), Token::A1).unwrap();
        }
        assert_eq!(reg.subscribe("one/more", Token::B), Err(RegistryError::Full));
        assert_eq!(reg.len(), MAX_BINDINGS);
    }
}
