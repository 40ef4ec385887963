//! One-shot registration of the `/chat` slash command for a single guild.
//!
//! Reads `DISCORD_BOT_TOKEN`, `GUILD_ID` and `DISCORD_API_BASE` from the
//! environment (or `./.env`) and prints the platform's response body.

use anyhow::Context;
use clap::Parser;

use dgb_discord::commands::{chat_command, register_guild_command};

#[derive(Debug, Parser)]
#[command(name = "dgb-register", about = "Register the /chat command for a guild")]
struct Cli {
    /// Application id the command belongs to.
    #[arg(long = "app")]
    app: String,

    #[arg(long = "guild", env = "GUILD_ID")]
    guild: String,

    #[arg(long = "token", env = "DISCORD_BOT_TOKEN", hide_env_values = true)]
    token: String,

    #[arg(
        long = "api-base",
        env = "DISCORD_API_BASE",
        default_value = "https://discord.com/api/v10"
    )]
    api_base: String,
}

fn main() -> anyhow::Result<()> {
    // Before clap, so `env = ...` defaults see `.env` values.
    dgb_core::config::load_dotenv()?;
    let cli = Cli::parse();

    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start tokio runtime")?
        .block_on(register(cli))
}

async fn register(cli: Cli) -> anyhow::Result<()> {
    let body = register_guild_command(
        &cli.api_base,
        &cli.app,
        &cli.guild,
        &cli.token,
        &chat_command(),
    )
    .await
    .with_context(|| format!("registering /chat for guild {}", cli.guild))?;

    println!("{body}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_explicit_flags() {
        let cli = Cli::try_parse_from([
            "dgb-register",
            "--app",
            "app-1",
            "--guild",
            "g-1",
            "--token",
            "t",
            "--api-base",
            "http://127.0.0.1:9",
        ])
        .unwrap();
        assert_eq!(cli.app, "app-1");
        assert_eq!(cli.guild, "g-1");
        assert_eq!(cli.api_base, "http://127.0.0.1:9");
    }

    #[test]
    fn app_is_required() {
        assert!(Cli::try_parse_from(["dgb-register", "--guild", "g", "--token", "t"]).is_err());
    }
}
