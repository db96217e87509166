use std::process::ExitCode;
use std::time::Duration;

use colored::*;
use dialoguer::Input;
use indicatif::{ProgressBar, ProgressStyle};
use multimodal_main::{
    config::config_file_path,
    render::{sanitize, Transcript},
    ChatError, ChatSession, ConfigState, ContentGenerator, GeminiClient, SendOutcome,
};
use tracing_subscriber::EnvFilter;

const HELP: &str = "\
/attach <path>   attach an image to the next message
/detach          remove the pending image
/copy <n>        copy code block n to the clipboard
/preview <n>     preview HTML code block n in a browser
/source <n>      show the source of code block n again
/history         print the whole conversation
/help            show this help
/quit            leave the chat
//text           send a message that starts with /
Lines starting with any other /word are sent as ordinary messages.";

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Attach(String),
    Detach,
    Copy(usize),
    Preview(usize),
    Source(usize),
    History,
    Help,
    Quit,
    Message(String),
    Invalid(String),
}

impl Command {
    fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        let Some(rest) = trimmed.strip_prefix('/') else {
            return Self::Message(line.to_string());
        };
        if rest.starts_with('/') {
            return Self::Message(rest.to_string());
        }
        let (name, argument) = match rest.split_once(char::is_whitespace) {
            Some((name, argument)) => (name, argument.trim()),
            None => (rest, ""),
        };

        let number = || {
            argument
                .parse::<usize>()
                .map_err(|_| format!("/{name} expects a code block number"))
        };
        let parsed = match name {
            "attach" if argument.is_empty() => Err("/attach expects a file path".to_string()),
            "attach" => Ok(Self::Attach(argument.to_string())),
            "detach" => Ok(Self::Detach),
            "copy" => number().map(Self::Copy),
            "preview" => number().map(Self::Preview),
            "source" => number().map(Self::Source),
            "history" => Ok(Self::History),
            "help" => Ok(Self::Help),
            "quit" | "exit" => Ok(Self::Quit),
            _ => return Self::Message(line.to_string()),
        };
        parsed.unwrap_or_else(Self::Invalid)
    }
}

fn print_config_error(reason: &str) {
    println!("\n{}", "Multimodal Main".bright_green().bold());
    println!("{}", "═".repeat(50).bright_red());
    println!("{}", "Configuration error".bright_red().bold());
    println!("{reason}");
    println!(
        "\nSet the {} environment variable (or add {} to {}), then restart.",
        "API_KEY".yellow(),
        "api_key".yellow(),
        config_file_path()
            .map(|path| path.display().to_string())
            .unwrap_or_else(|| "~/.multimodal-main/config.json".to_string())
            .cyan()
    );
    println!("{}", "═".repeat(50).bright_red());
}

fn spinner() -> ProgressBar {
    let style = ProgressStyle::with_template("{spinner} {wide_msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏");
    let progress_bar = ProgressBar::new_spinner();
    progress_bar.set_style(style);
    progress_bar.set_message("🤔 Thinking...");
    progress_bar.enable_steady_tick(Duration::from_millis(100));
    progress_bar
}

/// Renders every message the transcript has not shown yet.
fn print_new_messages<G: ContentGenerator>(session: &ChatSession<G>, transcript: &mut Transcript) {
    let shown = transcript.messages().len();
    for message in &session.conversation().messages()[shown..] {
        println!("{}", transcript.push(message));
    }
}

fn read_line(pending: Option<&str>) -> Result<String, ChatError> {
    let prompt = match pending {
        Some(label) => format!("You [📎 {label}]"),
        None => "You".to_string(),
    };
    Input::<String>::new()
        .with_prompt(prompt)
        .allow_empty(true)
        .interact_text()
        .map_err(|err| ChatError::new(err.to_string()))
}

async fn run<G: ContentGenerator>(mut session: ChatSession<G>) -> Result<(), ChatError> {
    println!("{}", "🤖 Multimodal Main".bright_green().bold());
    println!("{}", "Created by a programmer · /help for commands".bright_black());
    println!("{}", "━".repeat(50).bright_black());

    let mut transcript = Transcript::new();
    print_new_messages(&session, &mut transcript);

    loop {
        let pending = session.attachment_preview().map(|preview| preview.label().to_string());
        let line = read_line(pending.as_deref())?;

        match Command::parse(&line) {
            Command::Message(text) => {
                if !session.can_send(&text) {
                    println!("{}", "Type a message or /attach an image first.".bright_black());
                    continue;
                }
                let progress_bar = spinner();
                let outcome = session.send(&text).await;
                progress_bar.finish_and_clear();

                match outcome {
                    SendOutcome::Replied(_) => print_new_messages(&session, &mut transcript),
                    SendOutcome::Busy => println!("{}", "Still waiting for the last reply.".yellow()),
                    SendOutcome::Ignored => {}
                }
                if let Some(error) = session.error() {
                    println!("{} {}", "❌".red(), sanitize(error).red());
                }
            }
            Command::Attach(path) => match session.attach_file(&path).await {
                Ok(preview) => println!("{} {}", "📎 Attached".green(), preview.label()),
                Err(err) => println!("{} {}", "❌".red(), err.to_string().red()),
            },
            Command::Detach => {
                if session.remove_attachment() {
                    println!("{}", "Attachment removed.".green());
                } else {
                    println!("{}", "Nothing is attached.".bright_black());
                }
            }
            Command::Copy(number) => match transcript.code_block_mut(number) {
                Some(block) => {
                    print!("{}", block.osc52());
                    block.copy();
                    if let Some(message) = transcript.message_with_code_block(number) {
                        println!("{message}");
                    }
                    if let Some(block) = transcript.code_block_mut(number) {
                        block.reset_copied();
                    }
                }
                None => println!("{}", format!("There is no code block {number}.").red()),
            },
            Command::Preview(number) => match transcript.code_block_mut(number) {
                Some(block) => match block.show_preview() {
                    Ok(preview) => println!(
                        "{} {}",
                        "🌐 Open in a browser:".green(),
                        preview.url().underline()
                    ),
                    Err(err) => println!("{} {}", "❌".red(), err.to_string().red()),
                },
                None => println!("{}", format!("There is no code block {number}.").red()),
            },
            Command::Source(number) => match transcript.code_block_mut(number) {
                Some(block) => {
                    block.show_source();
                    if let Some(message) = transcript.message_with_code_block(number) {
                        println!("{message}");
                    }
                }
                None => println!("{}", format!("There is no code block {number}.").red()),
            },
            Command::History => {
                for message in transcript.messages() {
                    println!("{message}");
                }
            }
            Command::Help => println!("{HELP}"),
            Command::Quit => break,
            Command::Invalid(reason) => println!("{}", reason.red()),
        }
    }

    println!("\n{}", "👋 Goodbye!".green().bold());
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let config = match ConfigState::load() {
        ConfigState::Configured(config) => config,
        ConfigState::NotConfigured { reason } => {
            print_config_error(&reason);
            return ExitCode::FAILURE;
        }
    };

    let client = match GeminiClient::new(config.clone()) {
        Ok(client) => client,
        Err(err) => {
            print_config_error(&err.to_string());
            return ExitCode::FAILURE;
        }
    };

    match run(ChatSession::new(client, &config)).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{} {}", "❌ Error:".red().bold(), err);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_a_message() {
        assert_eq!(
            Command::parse("hello /world"),
            Command::Message("hello /world".into())
        );
    }

    #[test]
    fn parses_commands_with_arguments() {
        assert_eq!(
            Command::parse("/attach  ./cat photo.png "),
            Command::Attach("./cat photo.png".into())
        );
        assert_eq!(Command::parse("/copy 2"), Command::Copy(2));
        assert_eq!(Command::parse("/preview 1"), Command::Preview(1));
        assert_eq!(Command::parse("/exit"), Command::Quit);
    }

    #[test]
    fn rejects_bad_arguments() {
        assert!(matches!(Command::parse("/copy two"), Command::Invalid(_)));
        assert!(matches!(Command::parse("/attach"), Command::Invalid(_)));
    }

    #[test]
    fn unknown_slash_words_are_sent_as_messages() {
        assert_eq!(
            Command::parse("/etc/hosts is what?"),
            Command::Message("/etc/hosts is what?".into())
        );
        assert_eq!(Command::parse("/dance"), Command::Message("/dance".into()));
    }

    #[test]
    fn double_slash_escapes_a_command_name() {
        assert_eq!(Command::parse("//help me"), Command::Message("/help me".into()));
        assert_eq!(Command::parse("  //copy 1"), Command::Message("/copy 1".into()));
    }
}
