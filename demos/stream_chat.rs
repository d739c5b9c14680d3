use std::io::{self, Write};

use dotenv::dotenv;
use futures::StreamExt;
use gpt_chat::{ApiKey, AskOptions, ChatRole, ChatSession, OpenAiConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let config = OpenAiConfig::from_api_key(ApiKey::Default)?;
    let mut chat = ChatSession::new(config)?;
    chat.add_message("You are a virtual assistant expert in Rust", ChatRole::System);

    let mut answers = chat
        .ask("Give me 3 useful functions for slices", AskOptions::streaming())
        .await?;

    while let Some(fragment) = answers.next().await {
        if let Some(text) = fragment?.answer.as_text() {
            print!("{text}");
            io::stdout().flush()?;
        }
    }
    drop(answers);

    println!("\n\n{} messages in history", chat.messages().len());

    Ok(())
}
