use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::warn;

use resumify::chat::ChatReply;
use resumify::form::Collection;
use resumify::gallery::Dashboard;
use resumify::models::chat::Sender;
use resumify::session::ResumeSession;
use resumify::state::ClientState;
use resumify::voice::VoiceToolbar;

#[derive(Debug, Parser)]
#[command(name = "resumify", version, about = "Edit resumes on the Resumify service")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List your resumes with their scores.
    List,
    /// Create an empty resume.
    Create,
    Duplicate { id: String },
    Delete { id: String },
    /// Save the rendered PDF.
    Download {
        id: String,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Save rendered pages as JPEG files.
    Preview {
        id: String,
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
    },
    Score { id: String },
    /// List the template gallery.
    Examples,
    /// Start a new resume from a gallery example.
    UseExample { id: String },
    /// Print a resume's fields as JSON.
    Show { id: String },
    /// Edit a resume interactively with autosave.
    Edit { id: String },
    /// Send one message to the assistant.
    Chat { id: String, text: String },
    /// Turn text into speech.
    Speak {
        text: String,
        #[arg(short, long, default_value = "speech.mp3")]
        output: PathBuf,
    },
    /// Transcribe a WAV recording.
    Transcribe { file: PathBuf },
}

pub async fn run(command: Command, state: ClientState) -> Result<()> {
    let dashboard = Dashboard::new(state.clone());
    match command {
        Command::List => {
            let cards = dashboard.list_with_previews().await?;
            if cards.is_empty() {
                println!("No resumes yet. Run `resumify create` to start one.");
            }
            for card in cards {
                let score = card
                    .score
                    .map(|s| format!("{s:.0}"))
                    .unwrap_or_else(|| "-".to_string());
                let name = card.resume.form.full_name();
                let title = &card.resume.form.wanted_job_title;
                println!("{}  score {score:>3}  {name}  {title}", card.resume.id);
            }
        }
        Command::Create => {
            let created = dashboard.create_resume().await?;
            println!("{}", created.id);
        }
        Command::Duplicate { id } => {
            let created = dashboard.duplicate_resume(&id).await?;
            println!("{}", created.id);
        }
        Command::Delete { id } => {
            dashboard.delete_resume(&id).await?;
            println!("Deleted {id}");
        }
        Command::Download { id, output } => {
            let dest = output.unwrap_or_else(|| PathBuf::from(format!("{id}.pdf")));
            let size = dashboard.download_pdf(&id, &dest).await?;
            println!("Wrote {} ({size} bytes)", dest.display());
        }
        Command::Preview { id, output } => {
            let pages = dashboard.preview(&id).await?;
            for (n, page) in pages.iter().enumerate() {
                let dest = output.join(format!("{id}-page-{}.jpg", n + 1));
                tokio::fs::write(&dest, page)
                    .await
                    .with_context(|| format!("writing {}", dest.display()))?;
                println!("{}", dest.display());
            }
        }
        Command::Score { id } => match dashboard.score(&id).await {
            Some(score) => println!("{score:.1}"),
            None => bail!("Scoring is unavailable for {id}"),
        },
        Command::Examples => {
            for example in dashboard.list_examples().await? {
                println!("{}  {}", example.id, example.title);
            }
        }
        Command::UseExample { id } => {
            let created = dashboard.use_example(&id).await?;
            println!("{}", created.id);
        }
        Command::Show { id } => {
            let session = ResumeSession::open(&state, &id).await?;
            println!("{}", serde_json::to_string_pretty(&session.snapshot())?);
            session.close().await?;
        }
        Command::Edit { id } => edit(&state, &id).await?,
        Command::Chat { id, text } => {
            let session = ResumeSession::open(&state, &id).await?;
            let reply = session.send_chat(&text).await;
            // Close first so applied updates are saved even if printing fails.
            let closed = session.close().await;
            match reply? {
                Some(reply) => print_reply(&reply),
                None => println!("Nothing to send."),
            }
            closed?;
        }
        Command::Speak { text, output } => {
            let voice = VoiceToolbar::new(state);
            if voice.speak_to_file(&text, &output).await? {
                println!("Wrote {}", output.display());
            } else {
                println!("Nothing to say.");
            }
        }
        Command::Transcribe { file } => {
            let voice = VoiceToolbar::new(state);
            println!("{}", voice.transcribe_file(&file).await?);
        }
    }
    Ok(())
}

const EDIT_HELP: &str = "\
commands:
  set <path> <json>          e.g. set firstName \"Ada\" or set skills.0.level 4
  get <path>
  add <collection>           employment | education | skills
  remove <collection> <n>
  toggle <entry id>          expand or collapse an entry
  chat <message>
  clear                      forget the chat history
  show | status | save | retry | help | quit";

async fn edit(state: &ClientState, id: &str) -> Result<()> {
    let session = ResumeSession::open(state, id).await?;
    for message in session.chat().messages() {
        print_message(message.sender, &message.text);
    }
    println!("{EDIT_HELP}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    loop {
        let prompt = format!("[{}] > ", session.save_status().label());
        stdout.write_all(prompt.as_bytes()).await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        session.notify_activity();
        let line = line.trim();
        let (verb, rest) = line.split_once(' ').unwrap_or((line, ""));
        let rest = rest.trim();

        let outcome = match verb {
            "" => Ok(()),
            "quit" | "exit" => break,
            "help" => {
                println!("{EDIT_HELP}");
                Ok(())
            }
            _ => edit_command(&session, verb, rest).await,
        };
        if let Err(e) = outcome {
            println!("error: {e:#}");
        }
    }

    session.close().await?;
    Ok(())
}

async fn edit_command(session: &ResumeSession, verb: &str, rest: &str) -> Result<()> {
    match verb {
        "set" => {
            let (path, raw) = rest
                .split_once(' ')
                .context("usage: set <path> <json>")?;
            // Bare words are taken as strings.
            let value = serde_json::from_str(raw.trim())
                .unwrap_or_else(|_| serde_json::Value::String(raw.trim().to_string()));
            session.set(path, value)?;
        }
        "get" => println!("{}", session.get(rest)?),
        "add" => {
            let collection: Collection = rest.parse()?;
            let id = session.append(collection);
            println!("added {id}");
        }
        "remove" => {
            let (collection, index) = rest
                .split_once(' ')
                .context("usage: remove <collection> <index>")?;
            let collection: Collection = collection.parse()?;
            let index: usize = index.trim().parse().context("index must be a number")?;
            let id = session.remove(collection, index)?;
            println!("removed {id}");
        }
        "toggle" => {
            let expanded = session.toggle_expanded(rest);
            println!("{rest} {}", if expanded { "expanded" } else { "collapsed" });
        }
        "chat" => match session.send_chat(rest).await? {
            Some(reply) => print_reply(&reply),
            None => println!("Nothing to send."),
        },
        "clear" => {
            session.chat().clear()?;
            println!("chat cleared");
        }
        "show" => println!("{}", serde_json::to_string_pretty(&session.snapshot())?),
        "status" => println!("{}", session.save_status().label()),
        "save" => {
            session.save().await?;
            println!("{}", session.save_status().label());
        }
        "retry" => {
            if !session.save_status().is_error() {
                warn!("Retry requested with no failed save");
            }
            session.retry_save();
        }
        other => bail!("unknown command `{other}`, try `help`"),
    }
    Ok(())
}

fn print_reply(reply: &ChatReply) {
    print_message(reply.message.sender, &reply.message.text);
    if !reply.applied.is_empty() {
        println!("  updated: {}", reply.applied.join(", "));
    }
}

fn print_message(sender: Sender, text: &str) {
    let who = match sender {
        Sender::User => "you",
        Sender::Assistant => "assistant",
    };
    println!("{who}: {text}");
}
