use chrono::{DateTime, TimeDelta, Utc};
use futures::future::join_all;
use poise::CreateReply;
use poise::serenity_prelude::{GetMessages, Message, MessageId};
use tracing::{info, warn};

use crate::commands::Deferral;
use crate::commands::music::utils::embedded_messages;
use crate::{CommandResult, Context};

/// Discord refuses to bulk-delete messages older than this many days.
const BULK_DELETE_MAX_AGE_DAYS: i64 = 14;

/// Whether a message created at `created` can still go through bulk deletion.
fn is_bulk_deletable(created: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now - created < TimeDelta::days(BULK_DELETE_MAX_AGE_DAYS)
}

/// Split messages into (bulk-deletable, must-delete-individually).
fn partition_by_age(messages: &[Message], now: DateTime<Utc>) -> (Vec<MessageId>, Vec<MessageId>) {
    let (recent, old): (Vec<&Message>, Vec<&Message>) = messages.iter().partition(|message| {
        DateTime::from_timestamp(message.timestamp.unix_timestamp(), 0)
            .is_some_and(|created| is_bulk_deletable(created, now))
    });

    (
        recent.into_iter().map(|m| m.id).collect(),
        old.into_iter().map(|m| m.id).collect(),
    )
}

/// Delete a number of recent messages in this channel
#[poise::command(
    slash_command,
    guild_only,
    category = "Admin",
    default_member_permissions = "MANAGE_MESSAGES",
    required_permissions = "MANAGE_MESSAGES",
    required_bot_permissions = "MANAGE_MESSAGES"
)]
pub async fn clear(
    ctx: Context<'_>,
    #[description = "Number of messages to delete (1-100)"] amount: i64,
) -> CommandResult {
    let Some(limit) = u8::try_from(amount).ok().filter(|n| (1..=100).contains(n)) else {
        ctx.send(embedded_messages::error("Please choose an amount between 1 and 100."))
            .await?;
        return Ok(());
    };

    Deferral::Private.start(ctx).await?;

    let channel_id = ctx.channel_id();
    let messages = channel_id
        .messages(ctx.serenity_context(), GetMessages::new().limit(limit))
        .await?;
    let (recent, old) = partition_by_age(&messages, Utc::now());

    let mut deleted = 0;
    match recent.as_slice() {
        [] => {}
        [single] => {
            channel_id.delete_message(ctx.http(), *single).await?;
            deleted += 1;
        }
        batch => {
            channel_id.delete_messages(ctx.http(), batch).await?;
            deleted += batch.len();
        }
    }

    let results = join_all(
        old.iter()
            .map(|message_id| channel_id.delete_message(ctx.http(), *message_id)),
    )
    .await;
    for result in &results {
        match result {
            Ok(()) => deleted += 1,
            Err(e) => warn!("Failed to delete old message in {}: {}", channel_id, e),
        }
    }

    info!(
        "{} cleared {} message(s) in channel {}",
        ctx.author().name,
        deleted,
        channel_id
    );

    ctx.send(
        CreateReply::default()
            .content(format!("Deleted {deleted} message(s)."))
            .ephemeral(true),
    )
    .await?;

    Ok(())
}
