//! Console decision source.
//!
//! Prints each presented request and reads verdicts from a line-oriented
//! input (stdin in the daemon binary):
//!
//! ```text
//! accept [id]   allow a request
//! reject [id]   deny a request
//! list          show open requests
//! ```
//!
//! `id` may be any unambiguous prefix of the request UUID. Without an id the
//! most recently presented open request is targeted.

use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::debug;

use super::presenter::PresenterEvent;
use crate::domain::{RequestBody, RequestId};
use crate::ports::DecisionSink;

/// A parsed console line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    /// Post a verdict, optionally for a specific id prefix
    Decide {
        /// Verdict to post
        accepted: bool,
        /// Id prefix, or `None` for the latest open request
        target: Option<String>,
    },
    /// Print open requests
    List,
    /// Print usage
    Help,
}

impl ConsoleCommand {
    /// Parse one input line. Blank lines yield `Ok(None)`.
    pub fn parse(line: &str) -> Result<Option<Self>, String> {
        let mut words = line.split_whitespace();
        let Some(verb) = words.next() else {
            return Ok(None);
        };
        let target = words.next().map(str::to_ascii_lowercase);
        if words.next().is_some() {
            return Err(format!("too many arguments to '{verb}'"));
        }

        let command = match verb.to_ascii_lowercase().as_str() {
            "accept" | "a" | "y" => ConsoleCommand::Decide {
                accepted: true,
                target,
            },
            "reject" | "deny" | "r" | "n" => ConsoleCommand::Decide {
                accepted: false,
                target,
            },
            "list" | "ls" => ConsoleCommand::List,
            "help" | "?" => ConsoleCommand::Help,
            other => return Err(format!("unknown command '{other}'")),
        };
        Ok(Some(command))
    }
}

const USAGE: &str = "commands: accept [id] | reject [id] | list | help\n";

/// Interactive decision source driving a [`DecisionSink`].
pub struct ConsoleDecisions {
    sink: Arc<dyn DecisionSink>,
    /// Open requests in presentation order
    open: Vec<(RequestId, RequestBody)>,
}

impl ConsoleDecisions {
    /// Create a console that posts verdicts to `sink`.
    pub fn new(sink: Arc<dyn DecisionSink>) -> Self {
        Self {
            sink,
            open: Vec::new(),
        }
    }

    /// Run until the event stream closes.
    ///
    /// When `input` reaches EOF the console keeps printing events but no
    /// longer accepts commands.
    pub async fn run<R, W>(
        mut self,
        input: R,
        mut output: W,
        mut events: mpsc::UnboundedReceiver<PresenterEvent>,
    ) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = input.lines();
        let mut input_open = true;

        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(event) => {
                        let text = self.apply_event(event);
                        write(&mut output, &text).await?;
                    }
                    None => return Ok(()),
                },
                line = lines.next_line(), if input_open => match line? {
                    Some(line) => {
                        let text = self.execute(&line);
                        write(&mut output, &text).await?;
                    }
                    None => {
                        debug!("Console input closed");
                        input_open = false;
                    }
                },
            }
        }
    }

    fn apply_event(&mut self, event: PresenterEvent) -> String {
        match event {
            PresenterEvent::Presented { request_id, body } => {
                let text = format!(
                    "[{}] {}@{} requests {} ({})  accept/reject?\n",
                    request_id.short(),
                    body.user,
                    body.source,
                    body.service,
                    body.request_type
                );
                self.open.push((request_id, body));
                text
            }
            PresenterEvent::Withdrawn { request_id } => {
                self.open.retain(|(id, _)| *id != request_id);
                format!("[{}] withdrawn\n", request_id.short())
            }
        }
    }

    /// Execute one input line and return the text to print.
    pub fn execute(&mut self, line: &str) -> String {
        match ConsoleCommand::parse(line) {
            Ok(None) => String::new(),
            Ok(Some(ConsoleCommand::Help)) => USAGE.to_string(),
            Ok(Some(ConsoleCommand::List)) => self.list(),
            Ok(Some(ConsoleCommand::Decide { accepted, target })) => {
                self.decide(accepted, target.as_deref())
            }
            Err(message) => format!("{message}\n{USAGE}"),
        }
    }

    fn list(&self) -> String {
        if self.open.is_empty() {
            return "no open requests\n".to_string();
        }
        self.open
            .iter()
            .rev()
            .map(|(id, body)| {
                format!(
                    "{id}  {}@{} {} ({})\n",
                    body.user, body.source, body.service, body.request_type
                )
            })
            .collect()
    }

    fn decide(&mut self, accepted: bool, target: Option<&str>) -> String {
        let index = match self.find(target) {
            Ok(index) => index,
            Err(message) => return message,
        };
        let (request_id, _) = self.open.remove(index);
        let verdict = if accepted { "accepted" } else { "rejected" };

        if self.sink.resolve(&request_id, accepted) {
            format!("[{}] {verdict}\n", request_id.short())
        } else {
            format!("[{}] no longer pending\n", request_id.short())
        }
    }

    fn find(&self, target: Option<&str>) -> Result<usize, String> {
        let Some(prefix) = target else {
            return self
                .open
                .len()
                .checked_sub(1)
                .ok_or_else(|| "no open requests\n".to_string());
        };

        let matches: Vec<usize> = self
            .open
            .iter()
            .enumerate()
            .filter(|(_, (id, _))| {
                id.to_string().starts_with(prefix)
                    || id.as_uuid().simple().to_string().starts_with(prefix)
            })
            .map(|(index, _)| index)
            .collect();

        match matches.as_slice() {
            [index] => Ok(*index),
            [] => Err(format!("no open request matches '{prefix}'\n")),
            _ => Err(format!("'{prefix}' is ambiguous\n")),
        }
    }
}

async fn write<W: AsyncWrite + Unpin>(output: &mut W, text: &str) -> std::io::Result<()> {
    if text.is_empty() {
        return Ok(());
    }
    output.write_all(text.as_bytes()).await?;
    output.flush().await
}
