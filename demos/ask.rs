use dotenv::dotenv;
use gpt_chat::{Answer, ApiKey, ChatRole, ChatSession, OpenAiConfig, Tool};
use schemars::JsonSchema;
use tracing_subscriber::EnvFilter;

/// Get the current weather for a city.
#[derive(JsonSchema)]
#[allow(dead_code)]
struct WeatherArgs {
    /// City to look up (e.g. Lisbon).
    city: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = OpenAiConfig::from_api_key(ApiKey::Default)?.with_temperature(0.7);
    let mut chat = ChatSession::new(config)?;
    chat.add_message("You are a concise travel assistant", ChatRole::System);

    let answer = chat.complete("Name one museum in Lisbon.", None).await?;
    println!("{}", answer.answer.as_text().unwrap_or_default());
    if let Some(usage) = answer.usage {
        println!("({} tokens)", usage.total_tokens);
    }

    chat.set_tools(vec![Tool::from_schema::<WeatherArgs>("get_weather")?]);
    let answer = chat
        .complete("What's the weather like there today?", Some("demo-user"))
        .await?;

    match answer.answer {
        Answer::Text(text) => println!("{text}"),
        Answer::FunctionCall(calls) => {
            for call in calls {
                println!("model wants {}({})", call.function.name, call.function.arguments);
            }
        }
    }

    Ok(())
}
