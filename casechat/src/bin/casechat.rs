//! casechat - talk to a case's document-grounded assistant from a terminal.
//!
//! # Usage
//!
//! ```bash
//! # Ask a question; the reply streams to stdout
//! casechat send --conversation 6f1c "What is the notice period?"
//!
//! # Show a conversation with citations resolved
//! casechat history --conversation 6f1c
//!
//! # Point at another server, with debug logs on stderr
//! CASECHAT_LOG=debug casechat --base-url http://10.0.0.5:8000/api history -c 6f1c
//! ```

use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use casechat::telemetry::init_tracing;
use casechat::{
    badge_label, page_label, ApiClient, ChatController, Citation, CitationIndex, ClientConfig,
    ConversationId, Message, Role, Segment,
};
use clap::{Parser, Subcommand};
use tracing::{debug, info};

/// Command-line client for case conversations
#[derive(Parser, Debug)]
#[command(name = "casechat")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// API root
    #[arg(long, env = "CASECHAT_API_BASE", default_value = ClientConfig::DEFAULT_BASE_URL)]
    base_url: String,

    /// Timeout for non-streaming requests, in seconds
    #[arg(long, env = "CASECHAT_TIMEOUT_SECS", default_value_t = 30)]
    timeout_secs: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Send a message and stream the reply
    Send {
        /// Conversation ID
        #[arg(short, long)]
        conversation: String,

        /// Message text
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },
    /// Print the messages of a conversation
    History {
        /// Conversation ID
        #[arg(short, long)]
        conversation: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    let config = ClientConfig::new(&args.base_url)
        .with_context(|| format!("Invalid base URL: {}", args.base_url))?
        .with_timeout(Duration::from_secs(args.timeout_secs));
    let client = ApiClient::new(config).context("Failed to create API client")?;

    match args.command {
        Command::Send { conversation, text } => {
            send(client, ConversationId::from(conversation), &text.join(" ")).await
        }
        Command::History { conversation } => {
            history(client, ConversationId::from(conversation)).await
        }
    }
}

async fn send(client: ApiClient, conversation_id: ConversationId, text: &str) -> Result<()> {
    let chat = Arc::new(ChatController::with_client(conversation_id, client));

    let printed = Arc::new(AtomicUsize::new(0));
    let printer = tokio::spawn(print_live(chat.clone(), printed.clone()));

    let interrupt = tokio::spawn({
        let chat = chat.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Interrupted, cancelling exchange");
                chat.cancel();
            }
        }
    });

    let result = chat.submit(text).await;
    printer.abort();
    interrupt.abort();
    // The printer may be mid-write; let it reach its next await first.
    let _ = printer.await;

    let exchange = result.context("Exchange failed")?;

    let mut stdout = std::io::stdout().lock();
    let rest = exchange
        .text
        .get(printed.load(Ordering::Acquire)..)
        .unwrap_or_default();
    write!(stdout, "{rest}")?;
    writeln!(stdout)?;

    let index = CitationIndex::build(&exchange.citations);
    if !index.is_empty() {
        writeln!(stdout)?;
        for citation in index.sorted() {
            writeln!(stdout, "{}", citation_line(citation))?;
        }
    }
    stdout.flush()?;
    Ok(())
}

/// Echo live text as it grows. Stops once aborted or the session goes away.
async fn print_live(chat: Arc<ChatController>, printed: Arc<AtomicUsize>) {
    let mut state = chat.subscribe();
    while state.changed().await.is_ok() {
        let text = state.borrow_and_update().accumulated_text().to_string();
        let mut stdout = std::io::stdout().lock();
        if write_new_text(&mut stdout, &text, &printed).is_err() {
            debug!("stdout closed, stopping live output");
            return;
        }
    }
}

/// Write the part of `text` past `printed`, then advance `printed`.
///
/// The offset only moves after the write succeeded, so it never counts
/// bytes that did not reach `out`. Text shorter than the offset (a cleared
/// buffer) writes nothing.
fn write_new_text(out: &mut impl Write, text: &str, printed: &AtomicUsize) -> std::io::Result<()> {
    let from = printed.load(Ordering::Acquire);
    match text.get(from..) {
        Some(chunk) if !chunk.is_empty() => {
            out.write_all(chunk.as_bytes())?;
            out.flush()?;
            printed.store(text.len(), Ordering::Release);
            Ok(())
        }
        _ => Ok(()),
    }
}

async fn history(client: ApiClient, conversation_id: ConversationId) -> Result<()> {
    let chat = ChatController::with_client(conversation_id.clone(), client);
    chat.refresh()
        .await
        .with_context(|| format!("Failed to load conversation {conversation_id}"))?;

    let mut stdout = std::io::stdout().lock();
    for message in chat.view().messages {
        writeln!(stdout, "{}", message_block(&message))?;
    }
    Ok(())
}

fn citation_line(citation: &Citation) -> String {
    format!(
        "[{}] {} ({})",
        badge_label(citation),
        citation.document_name,
        page_label(citation)
    )
}

fn message_block(message: &Message) -> String {
    let who = match message.role {
        Role::User => "you",
        Role::Assistant => "assistant",
    };
    let body: String = ChatController::render(message)
        .into_iter()
        .map(|segment| match segment {
            Segment::Text { content } => content,
            Segment::CitationRef { citation } => {
                format!("[{}, {}]", citation.document_name, page_label(&citation))
            }
        })
        .collect();
    format!(
        "{} {}:\n{}\n",
        message.created_at.format("%Y-%m-%d %H:%M"),
        who,
        body
    )
}
