//! Interactive console driving a feed session from stdin.
//!
//! Each line is one event; the poll timer is another event source. Both are
//! handled on the same task, one at a time, so the session is never mutated
//! concurrently.

use crate::api::ArchiveSource;
use crate::i18n::Language;
use crate::outputs::markdown::{RenderContext, render_feed};
use crate::session::{FeedSession, PageOutcome};
use std::error::Error;
use std::str::FromStr;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Load the next older month.
    More,
    /// Fetch the latest window now.
    Poll,
    /// Switch the UI language.
    Language(Language),
    /// Empty the feed.
    Reset,
    /// Reset and run the initial load again.
    Reload,
    /// Print the feed.
    Show,
    Help,
    Quit,
}

impl FromStr for Command {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut words = s.split_whitespace();
        let head = words.next().unwrap_or_default().to_ascii_lowercase();
        let command = match head.as_str() {
            "more" | "m" => Command::More,
            "poll" | "p" => Command::Poll,
            "lang" | "language" | "l" => {
                let code = words.next().ok_or("usage: lang <en|ru>")?;
                Command::Language(code.parse()?)
            }
            "reset" => Command::Reset,
            "reload" | "r" => Command::Reload,
            "show" | "s" | "" => Command::Show,
            "help" | "h" | "?" => Command::Help,
            "quit" | "q" | "exit" => Command::Quit,
            other => return Err(format!("unknown command {:?} (try help)", other)),
        };
        Ok(command)
    }
}

fn help_text(language: Language) -> String {
    let menu = &language.translations().side_menu;
    format!(
        "commands: more | poll | lang <en|ru> ({}: {}) | reset | reload | show | quit\n",
        menu.language_selector, language
    )
}

/// Run the console until `quit` or end of input.
pub async fn run<S: ArchiveSource>(
    session: &mut FeedSession<S>,
    ctx: RenderContext,
    poll_every: Option<Duration>,
) -> Result<(), Box<dyn Error>> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    let polling = poll_every.is_some();
    let mut ticker = interval(poll_every.unwrap_or(Duration::from_secs(3600)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // the first tick completes immediately; the initial load already ran
    ticker.tick().await;

    stdout
        .write_all(help_text(session.language()).as_bytes())
        .await?;
    print_feed(session, &ctx, &mut stdout).await?;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    debug!("stdin closed");
                    break;
                };
                let command = match line.parse::<Command>() {
                    Ok(command) => command,
                    Err(e) => {
                        stdout.write_all(format!("{}\n", e).as_bytes()).await?;
                        continue;
                    }
                };
                if command == Command::Quit {
                    break;
                }
                handle(session, command, &mut stdout).await?;
                if command != Command::Help {
                    print_feed(session, &ctx, &mut stdout).await?;
                }
            }
            _ = ticker.tick(), if polling => {
                let inserted = session.poll_latest().await;
                if inserted > 0 {
                    info!(inserted, "Poll brought new articles");
                    print_feed(session, &ctx, &mut stdout).await?;
                }
            }
        }
    }
    Ok(())
}

async fn handle<S: ArchiveSource>(
    session: &mut FeedSession<S>,
    command: Command,
    stdout: &mut tokio::io::Stdout,
) -> Result<(), Box<dyn Error>> {
    match command {
        Command::More => match session.load_more().await {
            Some(PageOutcome::Added) => {}
            Some(outcome) => debug!(?outcome, "Load more finished without new articles"),
            None => stdout.write_all(b"nothing more to load\n").await?,
        },
        Command::Poll => {
            let inserted = session.poll_latest().await;
            stdout
                .write_all(format!("{} new articles\n", inserted).as_bytes())
                .await?;
        }
        Command::Language(language) => {
            if let Err(e) = session.change_language(language) {
                warn!(error = %e, "Language not persisted");
            }
        }
        Command::Reset => session.reset(),
        Command::Reload => {
            session.reset();
            session.initial_load().await;
        }
        Command::Help => {
            stdout
                .write_all(help_text(session.language()).as_bytes())
                .await?
        }
        Command::Show | Command::Quit => {}
    }
    Ok(())
}

async fn print_feed<S: ArchiveSource>(
    session: &FeedSession<S>,
    ctx: &RenderContext,
    stdout: &mut tokio::io::Stdout,
) -> Result<(), Box<dyn Error>> {
    let md = render_feed(&session.feed(), &session.status(), ctx);
    stdout.write_all(md.as_bytes()).await?;
    stdout.flush().await?;
    Ok(())
}
