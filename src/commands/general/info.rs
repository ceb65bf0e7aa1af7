use chrono::{DateTime, Utc};
use poise::CreateReply;
use poise::serenity_prelude::CreateEmbed;

use super::get_shard_latency;
use crate::{CommandResult, Context};

/// Format an elapsed time as "1d 2h 3m 4s". Zero units are left out, seconds never are.
pub fn format_uptime(since: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let total = (now - since).num_seconds().max(0);
    let (days, rest) = (total / 86_400, total % 86_400);
    let (hours, rest) = (rest / 3_600, rest % 3_600);
    let (minutes, seconds) = (rest / 60, rest % 60);

    let mut parts: Vec<String> = [(days, "d"), (hours, "h"), (minutes, "m")]
        .into_iter()
        .filter(|(value, _)| *value > 0)
        .map(|(value, unit)| format!("{value}{unit}"))
        .collect();
    parts.push(format!("{seconds}s"));

    parts.join(" ")
}

/// Show latency, uptime and version information
#[poise::command(slash_command, category = "General")]
pub async fn info(ctx: Context<'_>) -> CommandResult {
    let latency = match get_shard_latency(&ctx).await {
        Some(latency) => format!("{} ms", latency.as_millis()),
        None => "n/a".to_string(),
    };
    let uptime = format_uptime(ctx.data().launched_at, Utc::now());

    let embed = CreateEmbed::new()
        .title("ℹ️ Bot Info")
        .field("Latency", latency, true)
        .field("Uptime", uptime, true)
        .field("Version", format!("`{}`", env!("CARGO_PKG_VERSION")), true)
        .field("Library", "poise + serenity + songbird", true)
        .color(0x00ff00);

    ctx.send(CreateReply::default().embed(embed)).await?;

    Ok(())
}
