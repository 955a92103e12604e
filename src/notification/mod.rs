pub mod discord;

pub use discord::{build_embed, DiscordNotifier, Embed, EmbedField, WebhookPayload};
