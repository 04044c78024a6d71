use serenity::all::{
    CommandInteraction, CommandOptionType, CreateAttachment, CreateCommand, CreateCommandOption,
    CreateInteractionResponseMessage, ResolvedOption, ResolvedValue,
};

use crate::{
    constants::{DEFAULT_PERSONA, PERSONA_FILE_NAME},
    persona::PersonaStore,
};

pub const COMMAND_NAME: &str = "character";

/// The `/character` command tree, registered globally on ready.
pub fn register() -> CreateCommand {
    CreateCommand::new(COMMAND_NAME)
        .description("Manage this server's character persona")
        .add_option(
            CreateCommandOption::new(
                CommandOptionType::SubCommand,
                "set",
                "Add one line to the persona",
            )
            .add_sub_option(
                CreateCommandOption::new(CommandOptionType::String, "text", "Persona line to add")
                    .required(true),
            ),
        )
        .add_option(CreateCommandOption::new(
            CommandOptionType::SubCommand,
            "list",
            "Show the configured persona",
        ))
        .add_option(CreateCommandOption::new(
            CommandOptionType::SubCommand,
            "reset",
            "Remove the persona and fall back to the default",
        ))
        .add_option(
            CreateCommandOption::new(
                CommandOptionType::SubCommand,
                "upload",
                "Replace the persona with the lines of a .txt file",
            )
            .add_sub_option(
                CreateCommandOption::new(
                    CommandOptionType::Attachment,
                    "file",
                    "UTF-8 text file, one persona line per row",
                )
                .required(true),
            ),
        )
        .add_option(CreateCommandOption::new(
            CommandOptionType::SubCommand,
            "save",
            "Download the current persona as a .txt file",
        ))
}

/// Execute one `/character` invocation and build its response.
pub async fn run(
    store: &PersonaStore,
    command: &CommandInteraction,
) -> CreateInteractionResponseMessage {
    let Some(guild_id) = command.guild_id else {
        return message("このコマンドはサーバー内でのみ使えます。");
    };
    let guild_id = guild_id.get();

    let options = command.data.options();
    let Some(sub) = options.first() else {
        return message("サブコマンドを指定してください。");
    };

    match (sub.name, &sub.value) {
        ("set", ResolvedValue::SubCommand(args)) => set(store, guild_id, args).await,
        ("list", _) => list(store, guild_id).await,
        ("reset", _) => reset(store, guild_id).await,
        ("upload", ResolvedValue::SubCommand(args)) => upload(store, guild_id, args).await,
        ("save", _) => save(store, guild_id).await,
        (name, _) => {
            tracing::warn!(subcommand = name, "unknown /{COMMAND_NAME} subcommand");
            message("不明なサブコマンドです。")
        }
    }
}

async fn set(
    store: &PersonaStore,
    guild_id: u64,
    args: &[ResolvedOption<'_>],
) -> CreateInteractionResponseMessage {
    let text = args.iter().find_map(|opt| match (opt.name, &opt.value) {
        ("text", ResolvedValue::String(s)) => Some(*s),
        _ => None,
    });

    match text.map(str::trim).filter(|t| !t.is_empty()) {
        Some(text) => {
            let count = store.append(guild_id, text).await;
            message(format!("キャラクター設定を追加しました（現在 {count} 行）。"))
        }
        None => message("追加する設定テキストを指定してください。"),
    }
}

async fn list(store: &PersonaStore, guild_id: u64) -> CreateInteractionResponseMessage {
    match store.lines(guild_id).await {
        Some(lines) if !lines.is_empty() => {
            let body = lines
                .iter()
                .enumerate()
                .map(|(i, line)| format!("{}. {}", i + 1, line))
                .collect::<Vec<_>>()
                .join("\n");
            message(format!("現在のキャラクター設定:\n{body}"))
        }
        _ => message(format!(
            "キャラクター設定は未登録です。既定の設定を使用します:\n{DEFAULT_PERSONA}"
        )),
    }
}

async fn reset(store: &PersonaStore, guild_id: u64) -> CreateInteractionResponseMessage {
    if store.clear(guild_id).await {
        message("キャラクター設定をリセットしました。")
    } else {
        message("リセットする設定はありません。")
    }
}

async fn upload(
    store: &PersonaStore,
    guild_id: u64,
    args: &[ResolvedOption<'_>],
) -> CreateInteractionResponseMessage {
    let attachment = args.iter().find_map(|opt| match (opt.name, &opt.value) {
        ("file", ResolvedValue::Attachment(attachment)) => Some(*attachment),
        _ => None,
    });

    let Some(attachment) = attachment else {
        return message("アップロードするファイルを指定してください。");
    };

    if !is_text_attachment(&attachment.filename) {
        return message("`.txt` ファイルのみアップロードできます。");
    }

    let bytes = match attachment.download().await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::error!(
                error = %e,
                filename = %attachment.filename,
                "failed to download persona attachment"
            );
            return message("ファイルの取得に失敗しました。");
        }
    };

    let Ok(text) = String::from_utf8(bytes) else {
        return message("UTF-8 のテキストファイルを指定してください。");
    };

    let lines = persona_lines(&text);
    if lines.is_empty() {
        return message("ファイルに設定行がありません。");
    }

    let count = lines.len();
    store.replace(guild_id, lines).await;
    message(format!("キャラクター設定を置き換えました（{count} 行）。"))
}

async fn save(store: &PersonaStore, guild_id: u64) -> CreateInteractionResponseMessage {
    let lines = store
        .lines(guild_id)
        .await
        .filter(|lines| !lines.is_empty())
        .unwrap_or_else(|| vec![DEFAULT_PERSONA.to_string()]);

    let body = lines.join("\n") + "\n";
    message("現在のキャラクター設定です。")
        .add_file(CreateAttachment::bytes(body.into_bytes(), PERSONA_FILE_NAME))
}

fn message(content: impl Into<String>) -> CreateInteractionResponseMessage {
    CreateInteractionResponseMessage::new().content(content)
}

fn is_text_attachment(filename: &str) -> bool {
    std::path::Path::new(filename)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("txt"))
}

/// Split uploaded persona text into stored lines: trimmed, empties dropped,
/// order preserved.
fn persona_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn txt_extension_is_accepted_case_insensitively() {
        assert!(is_text_attachment("character.txt"));
        assert!(is_text_attachment("CHARACTER.TXT"));
        assert!(is_text_attachment("persona.v2.txt"));
    }

    #[test]
    fn other_extensions_are_rejected() {
        assert!(!is_text_attachment("character.md"));
        assert!(!is_text_attachment("character.txt.exe"));
        assert!(!is_text_attachment("character"));
        assert!(!is_text_attachment(""));
    }

    #[test]
    fn persona_lines_trim_and_drop_empties() {
        let text = "  first line  \n\n\tsecond line\n   \nthird\n";
        assert_eq!(persona_lines(text), vec!["first line", "second line", "third"]);
    }

    #[test]
    fn persona_lines_keep_order() {
        let text = "b\na\nc";
        assert_eq!(persona_lines(text), vec!["b", "a", "c"]);
    }

    #[test]
    fn blank_file_yields_no_lines() {
        assert!(persona_lines("\n  \n\t\n").is_empty());
        assert!(persona_lines("").is_empty());
    }
}
