use dotenv::dotenv;
use gpt_chat::{ApiKey, ChatSession, OpenAiConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    tracing_subscriber::fmt::init();

    let chat = ChatSession::new(OpenAiConfig::from_api_key(ApiKey::Default)?)?;
    let response = chat.create_embedding("The food was delicious").await?;

    let dimensions = response["data"][0]["embedding"]
        .as_array()
        .map(Vec::len)
        .unwrap_or_default();
    println!("{dimensions} dimensions from {}", response["model"]);

    Ok(())
}
