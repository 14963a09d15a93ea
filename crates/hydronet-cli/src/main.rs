mod render;

use clap::{Parser, Subcommand};
use hydronet_client::{ClientConfig, HydroNetClient, TurnSummary};
use std::io::Write;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "hydronet", about = "HydroNet water network assistant client")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "hydronet.toml")]
    config: PathBuf,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send a message, or start an interactive session without one
    Chat {
        /// Message to send
        message: Option<String>,
        /// Continue an existing conversation
        #[arg(short = 'C', long)]
        conversation: Option<String>,
        /// Wait for the complete answer instead of streaming it
        #[arg(long, requires = "message")]
        no_stream: bool,
    },
    /// List conversations
    Conversations,
    /// Show the messages of a conversation
    Show { id: String },
    /// Delete a conversation
    Delete { id: String },
    /// Show quota usage
    Quota,
    /// Show the referral code and its stats
    Referral,
    /// Show backend health and system information
    Status,
    /// List the MCP services available to the assistant
    Services,
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn run_turn(
    client: &HydroNetClient,
    conversation: Option<&str>,
    message: &str,
) -> anyhow::Result<TurnSummary> {
    let mut stdout = std::io::stdout();
    let summary = client
        .send_message(conversation, message, |update| {
            if let Some(text) = render::turn_update(update) {
                print!("{text}");
                let _ = stdout.flush();
            }
        })
        .await?;

    if !summary.completed {
        println!();
        warn!("Stream ended before the turn completed");
    }
    Ok(summary)
}

async fn interactive(client: &HydroNetClient, mut conversation: Option<String>) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "/quit" || line == "/exit" {
            break;
        }

        match run_turn(client, conversation.as_deref(), line).await {
            Ok(summary) => {
                if summary.conversation_id.is_some() {
                    conversation = summary.conversation_id;
                }
            }
            Err(e) => eprintln!("错误: {e}"),
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    let mut config = ClientConfig::load(&cli.config).await?;
    config.apply_env();
    info!(base_url = %config.base_url, user_id = %config.user_id, "HydroNet client ready");

    let client = HydroNetClient::new(config)?;

    match cli.command {
        Commands::Chat {
            message,
            conversation,
            no_stream,
        } => match message {
            Some(message) if no_stream => {
                let reply = client.chat(conversation.as_deref(), &message).await?;
                println!("{}", reply.message);
                if let Some(id) = reply.conversation_id {
                    info!(conversation_id = %id, "Conversation");
                }
            }
            Some(message) => {
                let summary = run_turn(&client, conversation.as_deref(), &message).await?;
                if let Some(id) = summary.conversation_id {
                    info!(conversation_id = %id, "Conversation");
                }
            }
            None => interactive(&client, conversation).await?,
        },
        Commands::Conversations => {
            let conversations = client.list_conversations().await?;
            if conversations.is_empty() {
                println!("暂无对话");
            } else {
                let now = chrono::Utc::now();
                for summary in &conversations {
                    println!("{}", render::conversation(summary, now));
                }
            }
        }
        Commands::Show { id } => {
            let detail = client.get_conversation(&id).await?;
            println!("# {}", detail.conversation.title);
            for message in &detail.messages {
                println!("\n[{}] {}", message.role, message.content);
                match message.tool_history(client.config().correlation) {
                    Ok(history) => {
                        for invocation in history.invocations() {
                            println!("{}", render::invocation(invocation));
                        }
                    }
                    Err(e) => warn!(error = %e, "Unreadable tool history"),
                }
            }
        }
        Commands::Delete { id } => {
            client.delete_conversation(&id).await?;
            println!("已删除 {id}");
        }
        Commands::Quota => {
            let quota = client.quota().await?;
            println!("{}", render::quota(&quota));
            if !quota.can_use {
                println!("额度已用完");
            }
        }
        Commands::Referral => {
            let referral = client.referral().await?;
            println!("{}", render::referral(&referral));
        }
        Commands::Status => {
            let info = client.system_info().await?;
            let health = client.health().await?;
            println!("{}", render::status(&info, &health));
        }
        Commands::Services => {
            let services = client.services().await?;
            if services.is_empty() {
                println!("暂无MCP服务");
            }
            for service in &services {
                println!("{}", render::service(service));
            }
        }
    }

    Ok(())
}
