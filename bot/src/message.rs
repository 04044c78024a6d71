use rand::RngExt as _;

use crate::constants::MESSAGE_MAX_LEN;

/// How an outgoing reply addresses the user it answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyStyle {
    NamePrefixed,
    NameSuffixed,
    Bare,
}

impl ReplyStyle {
    /// Uniformly random style for one outgoing reply.
    pub fn pick() -> Self {
        match rand::rng().random_range(0..3) {
            0 => ReplyStyle::NamePrefixed,
            1 => ReplyStyle::NameSuffixed,
            _ => ReplyStyle::Bare,
        }
    }

    pub fn render(self, author_name: &str, reply: &str) -> String {
        match self {
            ReplyStyle::NamePrefixed => format!("{author_name}様、{reply}"),
            ReplyStyle::NameSuffixed => format!("{reply}（{author_name}様）"),
            ReplyStyle::Bare => reply.to_string(),
        }
    }
}

/// Format one reply for the channel: pick a template at random and clamp the
/// result to Discord's message length limit.
pub fn format_reply(author_name: &str, reply: &str) -> String {
    clamp_to_message_limit(&ReplyStyle::pick().render(author_name, reply))
}

fn clamp_to_message_limit(text: &str) -> String {
    match text.char_indices().nth(MESSAGE_MAX_LEN) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}
