use difychat::cli::{
    failure_text, interpret_line, parse_args, CliCommand, ReplInput, SUGGESTED_QUESTIONS, USAGE,
    VERSION,
};
use difychat::client::DifyClient;
use difychat::config::ChatConfig;
use difychat::session::ChatSession;

use color_eyre::Result;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

/// Log to stderr so streamed answers on stdout stay clean.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_banner(config: &ChatConfig, blocking: bool) {
    println!("{} (difychat {})", config.app_name, VERSION);
    println!("{}", config.app_description);
    println!(
        "Mode: {}. Type /new for a new conversation, /quit to exit.",
        if blocking { "blocking" } else { "streaming" }
    );
    println!("Suggested questions:");
    for (i, question) in SUGGESTED_QUESTIONS.iter().enumerate() {
        println!("  {}. {}", i + 1, question);
    }
}

fn prompt() -> std::io::Result<()> {
    print!("\n> ");
    std::io::stdout().flush()
}

#[tokio::main]
async fn main() -> Result<()> {
    let blocking = match parse_args(std::env::args()) {
        CliCommand::Version => {
            println!("difychat {}", VERSION);
            return Ok(());
        }
        CliCommand::Help => {
            println!("{}", USAGE);
            return Ok(());
        }
        CliCommand::Chat { blocking } => blocking,
    };

    color_eyre::install()?;
    init_tracing();

    let config = ChatConfig::from_env();
    config.validate()?;
    let client = DifyClient::from_config(&config)?;
    tracing::info!(endpoint = client.endpoint_url(), user = client.user(), "Client ready");

    let mut session = ChatSession::new(client);
    print_banner(&config, blocking);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    prompt()?;

    while let Some(line) = lines.next_line().await? {
        match interpret_line(&line) {
            ReplInput::Empty => {}
            ReplInput::Quit => break,
            ReplInput::NewConversation => match session.reset() {
                Ok(()) => println!("Started a new conversation."),
                Err(e) => println!("{}", e),
            },
            ReplInput::Query(query) => {
                let mut printed = false;
                let result = if blocking {
                    session.ask_blocking(query).await.map(|response| {
                        print!("{}", response.answer);
                    })
                } else {
                    session
                        .ask(query, |fragment| {
                            printed = true;
                            print!("{}", fragment);
                            let _ = std::io::stdout().flush();
                        })
                        .await
                        .map(|_| ())
                };

                if result.is_err() {
                    if let Some(message) = session.conversation().messages().last() {
                        print!("{}", failure_text(printed, &message.content));
                    }
                }
                println!();
            }
        }
        prompt()?;
    }

    Ok(())
}
