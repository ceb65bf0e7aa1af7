pub(crate) mod info;
pub(crate) mod ping;

use crate::Context;
use poise::serenity_prelude as serenity;
use std::time::Duration;

/// Latency of the shard this command came in on
async fn get_shard_latency(ctx: &Context<'_>) -> Option<Duration> {
    // The shard manager is an interface for mutating, stopping, restarting, and
    // retrieving information about shards.
    let shard_manager = ctx.framework().shard_manager();
    let runners = shard_manager.runners.lock().await;

    let runner = runners.get(&serenity::ShardId(ctx.serenity_context().shard_id.0))?;

    runner.latency
}
