use const_format::formatcp;
use std::time::Duration;

/// Name of the character the bot plays when a guild has not configured one.
pub const DEFAULT_CHARACTER_NAME: &str = "サイカワ";

/// Workplace of the default character, referenced by the default persona only.
pub const DEFAULT_CHARACTER_WORKPLACE: &str = "桝見荘";

/// System prompt segment used for guilds without a stored persona.
pub const DEFAULT_PERSONA: &str = formatcp!(
    "あなたは『{DEFAULT_CHARACTER_NAME}』です。『{DEFAULT_CHARACTER_WORKPLACE}』の管理人代行をしています。"
);

/// How long a user's conversation history survives without new activity.
pub const HISTORY_EXPIRATION: Duration = Duration::from_secs(300); // 5 minutes

/// Sent to the channel when the completion call fails.
pub const FALLBACK_REPLY: &str =
    "申し訳ありません、いまはお返事できないようです…🙇 少し待ってからもう一度話しかけてください。";

pub const DEFAULT_COMPLETION_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_COMPLETION_TIMEOUT: Duration = Duration::from_secs(30);

/// Discord rejects messages longer than this many characters.
pub const MESSAGE_MAX_LEN: usize = 2000;

/// Filename used when sending a guild's persona back as an attachment.
pub const PERSONA_FILE_NAME: &str = "character.txt";
