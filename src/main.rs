// Streamchat — interactive chat front-end
//
// Reads prompts from stdin, streams the assistant reply token-by-token to
// stdout, and keeps a caller-owned transcript of the session. One request
// per turn; a transport failure prints a fallback line and the loop
// continues.

use clap::{Parser, Subcommand};
use futures::StreamExt;
use log::error;
use std::io::Write as _;
use streamchat::client::ChatClient;
use streamchat::config::{self, Config};
use streamchat::error::ChatResult;
use streamchat::request::{CompletionRequest, Role, SamplingParams};
use streamchat::transcript::Transcript;
use tokio::io::{AsyncBufReadExt, BufReader};

const FALLBACK_REPLY: &str = "Sorry, I couldn't generate a response.";

#[derive(Parser)]
#[command(name = "streamchat", version, about = "Stream chat completions to your terminal")]
struct Cli {
    /// Full chat-completions URL (including any deployment path).
    #[arg(long, env = config::ENDPOINT_ENV)]
    endpoint: Option<String>,

    /// Maximum tokens to generate per reply.
    #[arg(long, default_value_t = 1000)]
    max_tokens: u32,

    /// Sampling temperature; higher values increase randomness (0–2).
    #[arg(long, default_value_t = 0.7)]
    temperature: f64,

    /// Nucleus sampling: restrict to the top-probability tokens (0–1).
    #[arg(long, default_value_t = 1.0)]
    top_p: f64,

    /// Penalize repeated tokens to reduce redundancy (0–2).
    #[arg(long, default_value_t = 0.0)]
    frequency_penalty: f64,

    /// Penalize tokens already present to encourage new topics (0–2).
    #[arg(long, default_value_t = 0.0)]
    presence_penalty: f64,

    /// Send one prompt, print the reply, and exit (no interactive loop).
    #[arg(long)]
    prompt: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Store the API key in the OS keychain (read from stdin).
    SetKey,
    /// Remove the stored API key from the OS keychain.
    ClearKey,
}

#[tokio::main]
async fn main() {
    env_logger::init();
    if let Err(e) = run().await {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

async fn run() -> ChatResult<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Command::SetKey) => return set_key().await,
        Some(Command::ClearKey) => {
            config::clear_api_key()?;
            println!("API key removed from keychain.");
            return Ok(());
        }
        None => {}
    }

    let cfg = Config::resolve(cli.endpoint.clone())?;
    let client = ChatClient::new(cfg)?;
    let params = SamplingParams {
        max_tokens: cli.max_tokens,
        temperature: cli.temperature,
        top_p: cli.top_p,
        frequency_penalty: cli.frequency_penalty,
        presence_penalty: cli.presence_penalty,
    };
    let mut transcript = Transcript::new();

    if let Some(prompt) = cli.prompt {
        run_turn(&client, &params, &mut transcript, &prompt).await;
        return Ok(());
    }

    println!("streamchat — type a message, /history for the session so far, /quit to exit");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("you> ");
        std::io::stdout().flush().ok();
        let line = match lines.next_line().await {
            Ok(Some(l)) => l,
            _ => break, // EOF or stdin failure ends the session
        };
        let input = line.trim();
        match input {
            "" => continue,
            "/quit" | "/exit" => break,
            "/history" => {
                render_transcript(&transcript);
                continue;
            }
            prompt => run_turn(&client, &params, &mut transcript, prompt).await,
        }
    }
    Ok(())
}

/// One chat turn: send the prompt, stream deltas to stdout as they arrive,
/// and append the accumulated reply to the transcript. Any transport
/// failure prints the fallback line instead; the transcript gets no
/// assistant entry for a failed turn.
async fn run_turn(
    client: &ChatClient,
    params: &SamplingParams,
    transcript: &mut Transcript,
    prompt: &str,
) {
    transcript.push(Role::User, prompt);
    let request = CompletionRequest::from_prompt(prompt, params);

    let mut stream = match client.stream_completion(&request).await {
        Ok(s) => s,
        Err(e) => {
            error!("[chat] request failed: {}", e);
            println!("{}", FALLBACK_REPLY);
            return;
        }
    };

    let mut reply = String::new();
    let mut failed = false;
    while let Some(next) = stream.next().await {
        match next {
            Ok(delta) => {
                print!("{}", delta);
                std::io::stdout().flush().ok();
                reply.push_str(&delta);
            }
            Err(e) => {
                error!("[chat] stream aborted: {}", e);
                failed = true;
                break;
            }
        }
    }
    println!();

    if failed {
        println!("{}", FALLBACK_REPLY);
    } else {
        transcript.push(Role::Assistant, reply);
    }
}

fn render_transcript(transcript: &Transcript) {
    if transcript.is_empty() {
        println!("(no messages yet)");
        return;
    }
    for entry in transcript.entries() {
        println!(
            "[{}] {}: {}",
            entry.timestamp.format("%H:%M:%S"),
            entry.role.label(),
            entry.content
        );
    }
}

async fn set_key() -> ChatResult<()> {
    print!("API key: ");
    std::io::stdout().flush().ok();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let key = match lines.next_line().await {
        Ok(Some(l)) => l.trim().to_string(),
        _ => String::new(),
    };
    if key.is_empty() {
        return Err(streamchat::ChatError::Config(
            "no API key entered".into(),
        ));
    }
    config::store_api_key(&key)?;
    println!("API key stored in keychain.");
    Ok(())
}
