use std::sync::Arc;

use arc_swap::ArcSwap;
use serenity::all::{
    Command, Context, CreateInteractionResponse, EventHandler, Interaction, Message, Ready, Typing,
    UserId,
};
use serenity::async_trait;

use crate::{
    commands,
    completion::{ChatMessage, CompletionClient, CompletionError},
    config::ServerConfig,
    constants::FALLBACK_REPLY,
    message::format_reply,
    persona::PersonaStore,
    session::SessionStore,
};

pub struct DiscordEventHandler {
    sessions: SessionStore,
    personas: PersonaStore,
    completion: CompletionClient,
    bot_user_id: ArcSwap<Option<UserId>>,
    discord_mention_only: bool,
}

impl DiscordEventHandler {
    pub fn new(config: &ServerConfig) -> Result<Self, CompletionError> {
        let completion = CompletionClient::new(
            config.openai_api_key.clone(),
            &config.openai_base_url,
            config.completion_model.clone(),
            config.completion_timeout,
        )?;

        Ok(DiscordEventHandler {
            sessions: SessionStore::new(config.history_expiration),
            personas: PersonaStore::new(),
            completion,
            bot_user_id: ArcSwap::new(Arc::new(None)),
            discord_mention_only: config.discord_mention_only,
        })
    }

    fn should_handle(&self, msg: &Message) -> bool {
        if msg.author.bot {
            return false;
        }

        // Mention gating only applies in guild channels; DMs have no mention UX.
        if self.discord_mention_only && msg.guild_id.is_some() {
            match **self.bot_user_id.load() {
                Some(bot_id) => msg.mentions_user_id(bot_id),
                None => false,
            }
        } else {
            true
        }
    }

    /// Strip mention tokens aimed at the bot so they don't leak into the prompt.
    fn prompt_text(&self, msg: &Message) -> String {
        let mut content = msg.content.clone();
        if let Some(bot_id) = **self.bot_user_id.load() {
            content = content
                .replace(&format!("<@{bot_id}>"), "")
                .replace(&format!("<@!{bot_id}>"), "");
        }
        content.trim().to_string()
    }

    async fn respond_to_message(&self, ctx: &Context, msg: &Message) -> Result<(), eyre::Error> {
        let user_text = self.prompt_text(msg);
        if user_text.is_empty() {
            return Ok(());
        }

        let user_id = msg.author.id.get();
        self.sessions.touch(user_id).await;

        let mut prompt = self
            .personas
            .system_messages(msg.guild_id.map(|id| id.get()))
            .await;
        prompt.extend(self.sessions.history(user_id).await);
        prompt.push(ChatMessage::user(user_text.as_str()));

        let _typing = Typing::start(ctx.http.clone(), msg.channel_id);

        match self.completion.complete(&prompt).await {
            Ok(reply) => {
                // The pair is committed only now, so a failed call leaves the
                // history exactly as it was.
                self.sessions
                    .record_exchange(user_id, &user_text, &reply)
                    .await;
                msg.channel_id
                    .say(&ctx.http, format_reply(&msg.author.name, &reply))
                    .await?;
            }
            Err(e) => {
                tracing::error!(error = %e, user_id, "completion request failed");
                msg.channel_id.say(&ctx.http, FALLBACK_REPLY).await?;
            }
        }

        Ok(())
    }
}

#[async_trait]
impl EventHandler for DiscordEventHandler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        tracing::info!("Discord bot {} is connected!", ready.user.name);

        // Store bot user ID for self-ignore and mention detection
        self.bot_user_id.store(Arc::new(Some(ready.user.id)));

        if self.discord_mention_only {
            tracing::info!("Bot is in mention-only mode - will only respond to mentions");
        }

        if let Err(e) = Command::set_global_commands(&ctx.http, vec![commands::register()]).await {
            tracing::error!(
                error = %e,
                "Failed to register the /{} command",
                commands::COMMAND_NAME
            );
        }
    }

    async fn message(&self, ctx: Context, msg: Message) {
        if !self.should_handle(&msg) {
            return;
        }

        let _ = self.respond_to_message(&ctx, &msg).await.inspect_err(|e| {
            tracing::error!(
                ?e,
                channel_id = msg.channel_id.get(),
                "Failed to handle message"
            );
        });
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        if let Interaction::Command(command) = interaction {
            if command.data.name != commands::COMMAND_NAME {
                return;
            }

            let response = commands::run(&self.personas, &command).await;
            let _ = command
                .create_response(&ctx.http, CreateInteractionResponse::Message(response))
                .await
                .inspect_err(|e| {
                    tracing::error!(?e, "Failed to respond to /{} interaction", commands::COMMAND_NAME);
                });
        }
    }
}
