//! Chat command

use crate::app::{ChatArgs, OutputFormat};
use anyhow::Result;
use groundwork_core::{
    create_generator, ChatReply, ChatService, Config, ContextBuilder, ConversationStore,
    GroundworkError,
};
use std::io::BufRead;

pub async fn run(args: ChatArgs, config: &Config, format: OutputFormat) -> Result<()> {
    let service = ChatService::new(
        ContextBuilder::new(super::open_index(config)?),
        create_generator(config)?,
        config.retrieval.top_k,
    )
    .with_max_attempts(config.retry.max_attempts);
    let conversations = ConversationStore::from_config(&config.sessions);

    if !args.message.is_empty() {
        let message = args.message.join(" ");
        let reply = service.respond(&conversations, &args.session, &message).await;
        print_reply(&reply, format)?;
        if !reply.success {
            return Err(GroundworkError::Generation(format!(
                "no response from {}",
                service.generator().model_name()
            ))
            .into());
        }
        return Ok(());
    }

    // One turn per line; the session lives until stdin closes
    for line in std::io::stdin().lock().lines() {
        let line = line?;
        let message = line.trim();
        if message.is_empty() {
            continue;
        }
        let reply = service.respond(&conversations, &args.session, message).await;
        print_reply(&reply, format)?;
    }
    Ok(())
}

fn print_reply(reply: &ChatReply, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string(reply)?),
        OutputFormat::Text => {
            println!("{}", reply.response);
            if !reply.sources.is_empty() {
                eprintln!("Sources: {}", reply.sources.join(", "));
            }
        }
    }
    Ok(())
}
