use anyhow::Result;
use dotenvy::dotenv;
use log::{error, info};
use serenity::async_trait;
use serenity::http::Http;
use serenity::model::channel::Message;
use serenity::model::gateway::Ready;
use serenity::prelude::*;
use std::sync::Arc;

use nudge::assistant::Assistant;
use nudge::core::Config;
use nudge::database::Database;
use nudge::features::followup::{EscalationPolicy, FollowUpTracker};
use nudge::features::reminders::DeliveryScheduler;
use nudge::features::understanding::OpenAiModel;
use nudge::gateway::discord::truncate_for_message;
use nudge::gateway::DiscordGateway;

struct Handler {
    assistant: Arc<Assistant>,
}

#[async_trait]
impl EventHandler for Handler {
    async fn message(&self, ctx: Context, msg: Message) {
        if msg.author.bot {
            return;
        }

        // Direct messages only
        if msg.guild_id.is_some() {
            return;
        }

        let reply = self
            .assistant
            .handle_incoming_text(msg.author.id.0, &msg.content)
            .await;

        if let Err(e) = msg
            .channel_id
            .say(&ctx.http, truncate_for_message(&reply))
            .await
        {
            error!("Failed to reply to user {}: {e}", msg.author.id);
        }
    }

    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!("🎉 {} is connected and ready!", ready.user.name);
        info!("🔗 Gateway session ID: {:?}", ready.session_id);
        info!("🤖 Bot ID: {}", ready.user.id);
        info!("🌐 Gateway version: {}", ready.version);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv().ok();

    let config = Config::from_env()?;

    // The openai crate reads its key from the environment
    std::env::set_var("OPENAI_API_KEY", &config.openai_api_key);
    std::env::set_var("OPENAI_KEY", &config.openai_api_key);

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_level))
        .init();

    info!("Starting reminder bot...");

    let database = Arc::new(Database::new(&config.database_path).await?);
    let http = Arc::new(Http::new(&config.discord_token));
    let gateway = Arc::new(DiscordGateway::new(http));

    let policy = EscalationPolicy::from_minutes(&config.follow_up_minutes)
        .ok_or_else(|| anyhow::anyhow!("FOLLOW_UP_MINUTES must name at least one delay"))?;
    let followups = Arc::new(FollowUpTracker::new(gateway.clone(), policy));
    let scheduler = Arc::new(DeliveryScheduler::new(
        database.clone(),
        gateway,
        followups.clone(),
    ));

    // Pending reminders must be re-armed before any new message is accepted
    let recovered = scheduler.recover_all().await?;
    info!("⏰ {recovered} pending reminders re-armed");

    let model = Arc::new(OpenAiModel::new(
        config.openai_model.clone(),
        config.llm_max_tokens,
    ));
    let assistant = Assistant::new(
        database.clone(),
        database,
        model,
        scheduler,
        followups,
        config.user_utc_offset,
    );

    let handler = Handler {
        assistant: Arc::new(assistant),
    };

    let intents = GatewayIntents::DIRECT_MESSAGES | GatewayIntents::MESSAGE_CONTENT;

    let mut client = Client::builder(&config.discord_token, intents)
        .event_handler(handler)
        .await
        .map_err(|e| {
            error!("Failed to create Discord client: {e}");
            error!("This could indicate:");
            error!("  - Invalid bot token format");
            error!("  - Network issues reaching Discord API");
            anyhow::anyhow!("Client creation failed: {}", e)
        })?;

    info!("Establishing WebSocket connection to Discord gateway...");
    info!("Gateway intents: {intents:?}");

    if let Err(why) = client.start().await {
        error!("Gateway connection failed: {why:?}");
        error!("This could be due to:");
        error!("  - Invalid bot token");
        error!("  - Network connectivity issues");
        error!("  - Discord API outage");
        return Err(anyhow::anyhow!(
            "Failed to establish gateway connection: {}",
            why
        ));
    }

    Ok(())
}
