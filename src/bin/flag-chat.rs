//! Terminal front end for a running flagchat server.

use anyhow::Result;
use chrono::Local;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};

use flagchat::chat::DEFAULT_HIDDEN_FLAG;
use flagchat::{ChatSession, HttpAskTransport, Speaker, init_tracing};

#[derive(Parser)]
#[command(name = "flag-chat")]
#[command(author, version, about = "Guess the hidden flag from your terminal", long_about = None)]
struct Cli {
    /// Base URL of the flagchat server.
    #[arg(short, long, env = "FLAGCHAT_URL", default_value = "http://127.0.0.1:3000")]
    url: String,

    /// Country whose flag is hidden.
    #[arg(short, long, default_value = DEFAULT_HIDDEN_FLAG)]
    flag: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing("flagchat=error");

    let mut chat = ChatSession::new(HttpAskTransport::new(&cli.url), cli.flag);
    println!("Start by asking a question or making a guess about the hidden flag!");
    println!("(empty line to skip, /dismiss to clear an error, Ctrl-D to quit)");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim() == "/dismiss" {
            chat.dismiss_banner();
            continue;
        }

        chat.set_input(line);
        let seen = chat.transcript().len();
        if !chat.submit().await {
            continue;
        }

        // Skip the user's own line, it is already on screen.
        for turn in &chat.transcript()[seen..] {
            if turn.speaker == Speaker::Assistant {
                println!("[{}] host: {}", Local::now().format("%H:%M:%S"), turn.text);
            }
        }
        if let Some(banner) = chat.banner() {
            eprintln!("error: {banner} (type /dismiss to clear)");
        }
    }

    Ok(())
}
