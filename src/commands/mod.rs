//! This module aggregates all the command modules for the bot.

/// Moderation commands (e.g., clearing messages).
pub mod admins;
/// General purpose commands (e.g., ping, info).
pub mod general;
/// Voice and playback commands.
pub mod music;

use poise::FrameworkError;
use tracing::{debug, error, warn};

use crate::{Context, Data, Error};
use music::utils::embedded_messages;
use music::utils::music_manager::{GENERIC_FAILURE_MESSAGE, MusicError};

/// Every slash command this crate provides.
pub fn all() -> Vec<poise::Command<Data, Error>> {
    vec![
        general::ping::ping(),
        general::info::info(),
        admins::clear::clear(),
        music::join::join(),
        music::leave::leave(),
        music::play::play(),
        music::pause::pause(),
        music::resume::resume(),
        music::stop::stop(),
    ]
}

/// How a slow command acknowledges the interaction before doing its work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deferral {
    /// Everyone in the channel sees the placeholder and the reply that replaces it.
    Public,
    /// Only the invoker sees them.
    Private,
}

impl Deferral {
    pub async fn start(self, ctx: Context<'_>) -> Result<(), Error> {
        match self {
            Deferral::Public => ctx.defer().await?,
            Deferral::Private => ctx.defer_ephemeral().await?,
        }
        Ok(())
    }

    /// A follow-up takes the visibility of the deferred response, so a public
    /// placeholder has to go before a private reply can be sent.
    pub fn hides_private_replies(self) -> bool {
        self == Deferral::Public
    }

    /// Make room for a private error reply after a failed command.
    pub async fn withdraw_for_private_reply(self, ctx: Context<'_>) {
        if !self.hides_private_replies() {
            return;
        }
        if let poise::Context::Application(app) = ctx {
            if let Err(e) = app.interaction.delete_response(ctx.http()).await {
                warn!("Failed to withdraw deferred reply: {}", e);
            }
        }
    }
}

/// User-facing text for a failed command.
///
/// Music errors carry their own friendly message; anything else is logged in full
/// and answered with a generic one.
pub fn failure_message(command: &str, err: &Error) -> &'static str {
    match err.downcast_ref::<MusicError>() {
        Some(music_error) if music_error.is_internal() => {
            error!("Command '{}' failed: {}", command, music_error);
            music_error.user_message()
        }
        Some(music_error) => {
            debug!("Command '{}' refused: {}", command, music_error);
            music_error.user_message()
        }
        None => {
            error!("Unhandled error in command '{}': {:?}", command, err);
            GENERIC_FAILURE_MESSAGE
        }
    }
}

/// Framework-wide error hook. Every reply it sends is private to the invoker.
pub async fn on_error(framework_error: FrameworkError<'_, Data, Error>) {
    let (ctx, message) = match framework_error {
        FrameworkError::Command { error, ctx, .. } => {
            let message = failure_message(&ctx.command().qualified_name, &error);
            (ctx, message.to_string())
        }
        FrameworkError::MissingUserPermissions {
            missing_permissions,
            ctx,
            ..
        } => {
            let message = match missing_permissions {
                Some(permissions) => format!("You need the {permissions} permission to do that."),
                None => "You can't use that command here or you lack permissions.".to_string(),
            };
            (ctx, message)
        }
        FrameworkError::MissingBotPermissions {
            missing_permissions,
            ctx,
            ..
        } => {
            warn!(
                "Missing bot permissions for '{}': {}",
                ctx.command().qualified_name,
                missing_permissions
            );
            (
                ctx,
                "I don't have permission to complete that action. Please check my role permissions."
                    .to_string(),
            )
        }
        FrameworkError::CommandCheckFailed { ctx, .. } | FrameworkError::GuildOnly { ctx, .. } => (
            ctx,
            "You can't use that command here or you lack permissions.".to_string(),
        ),
        other => {
            if let Err(e) = poise::builtins::on_error(other).await {
                error!("Error while handling error: {}", e);
            }
            return;
        }
    };

    if let Err(e) = ctx.send(embedded_messages::error(&message)).await {
        warn!("Failed to send error reply: {}", e);
    }
}
