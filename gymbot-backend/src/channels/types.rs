//! Normalized transport types — what the core consumes from a channel.

/// One inbound command: the transport-provided user identity, the
/// chat to reply to, and the parsed command.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedCommand {
    pub user_id: String,
    pub chat_id: i64,
    pub kind: CommandKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CommandKind {
    Start,
    Help,
    Note(String),
    Query(String),
    Suggest(String),
    Unknown(String),
}
