use serde::Serialize;

/// Who authored a turn. Serialized the way the chat endpoint expects it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

/// A single exchange entry. Never mutated after it lands in the history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    role: Role,
    text: String,
}

impl Turn {
    pub fn user(text: &str) -> Self {
        Self {
            role: Role::User,
            text: text.to_string(),
        }
    }

    pub fn model(text: &str) -> Self {
        Self {
            role: Role::Model,
            text: text.to_string(),
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

/// UI state owned by the chat widget.
///
/// The history is append-only for the whole session and is sent back to
/// the endpoint as context on every request.
#[derive(Debug, Default)]
pub struct ConversationState {
    is_open: bool,
    is_typing: bool,
    history: Vec<Turn>,
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        self.is_open
    }

    pub fn set_open(&mut self, open: bool) {
        self.is_open = open;
    }

    pub fn is_typing(&self) -> bool {
        self.is_typing
    }

    pub fn set_typing(&mut self, typing: bool) {
        self.is_typing = typing;
    }

    pub fn push_turn(&mut self, turn: Turn) {
        self.history.push(turn);
    }

    pub fn history(&self) -> &[Turn] {
        &self.history
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_closed_idle_and_empty() {
        let state = ConversationState::new();
        assert!(!state.is_open());
        assert!(!state.is_typing());
        assert!(state.history().is_empty());
    }

    #[test]
    fn history_keeps_chronological_order() {
        let mut state = ConversationState::new();
        state.push_turn(Turn::user("Hello"));
        state.push_turn(Turn::model("Hi there"));
        state.push_turn(Turn::user("We need an audit"));

        let roles: Vec<Role> = state.history().iter().map(Turn::role).collect();
        assert_eq!(roles, vec![Role::User, Role::Model, Role::User]);
        assert_eq!(state.history()[2].text(), "We need an audit");
    }

    #[test]
    fn roles_serialize_lowercase() {
        assert_eq!(serde_json::to_string(&Role::User).unwrap(), "\"user\"");
        assert_eq!(serde_json::to_string(&Role::Model).unwrap(), "\"model\"");
    }
}
