//! Command-line surface of the `difychat` binary.
//!
//! ```ignore
//! use difychat::cli::{parse_args, CliCommand};
//!
//! match parse_args(std::env::args()) {
//!     CliCommand::Version => println!("difychat {}", difychat::cli::VERSION),
//!     CliCommand::Help => println!("{}", difychat::cli::USAGE),
//!     CliCommand::Chat { blocking } => { /* run the REPL */ }
//! }
//! ```

pub mod args;

pub use args::{parse_args, CliCommand};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub const USAGE: &str = "\
Usage: difychat [--blocking] [--version] [--help]

Chat with a Dify app from the terminal.

Options:
  --blocking     wait for whole answers instead of streaming
  -V, --version  print version
  -h, --help     print this help

Commands inside the chat:
  /new           start a new conversation
  /quit          exit
  1, 2, ...      send the numbered suggested question

Environment:
  DIFY_API_KEY (required), DIFY_API_URL, DIFY_USER, DIFY_TIMEOUT_SECS,
  DIFY_APP_NAME, DIFY_APP_DESCRIPTION, RUST_LOG";

/// Sample questions offered when a conversation starts.
pub const SUGGESTED_QUESTIONS: &[&str] = &[
    "我们单位需要采购50台办公电脑，就是普通的台式机，用于日常办公，预算大概30万。",
    "我们数据中心的核心交换机突然被雷击损坏，导致全公司内网瘫痪，业务完全中断。我们需要立刻找到有原厂授权和备件的公司进行抢修，恢复业务是第一位的，等不及走常规流程了。",
];

/// Input line typed at the prompt, interpreted.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplInput<'a> {
    Empty,
    Quit,
    NewConversation,
    Query(&'a str),
}

/// Interpret one line typed at the prompt.
///
/// A bare number selects from [`SUGGESTED_QUESTIONS`]; out-of-range numbers
/// are sent as typed.
pub fn interpret_line(line: &str) -> ReplInput<'_> {
    let line = line.trim();
    match line {
        "" => ReplInput::Empty,
        "/quit" | "/exit" => ReplInput::Quit,
        "/new" => ReplInput::NewConversation,
        _ => {
            let suggested = line
                .parse::<usize>()
                .ok()
                .and_then(|n| n.checked_sub(1))
                .and_then(|i| SUGGESTED_QUESTIONS.get(i));
            ReplInput::Query(suggested.copied().unwrap_or(line))
        }
    }
}

/// Text printed for a failed turn's assistant message.
///
/// Starts on a fresh line when part of the answer was already printed.
pub fn failure_text(partial_printed: bool, content: &str) -> String {
    if partial_printed {
        format!("\n{}", content)
    } else {
        content.to_string()
    }
}
