//! Terminal input on a dedicated thread.
//!
//! Only the reader thread touches the terminal, one request at a time, so a
//! hidden password prompt never races a pending line read. The async side
//! sends a request and awaits the answer, which lets the main loop keep
//! handling background results while the operator types.

use std::io::{self, BufRead, Write};
use std::sync::mpsc as std_mpsc;
use std::thread;

use anyhow::{anyhow, Result};
use tokio::sync::mpsc;

#[derive(Debug, Clone)]
pub enum Prompt {
    Line(String),
    Secret(String),
}

/// One answer per request; `None` on end of input.
type Answer = io::Result<Option<String>>;

pub struct InputReader {
    requests: std_mpsc::Sender<Prompt>,
    answers: mpsc::Receiver<Answer>,
    outstanding: bool,
}

impl InputReader {
    pub fn spawn() -> Self {
        let (request_tx, request_rx) = std_mpsc::channel::<Prompt>();
        let (answer_tx, answer_rx) = mpsc::channel::<Answer>(1);

        thread::spawn(move || {
            for prompt in request_rx {
                let answer = read_answer(&prompt);
                if answer_tx.blocking_send(answer).is_err() {
                    break;
                }
            }
        });

        Self {
            requests: request_tx,
            answers: answer_rx,
            outstanding: false,
        }
    }

    /// Reader that answers from `answers` in order, then reports end of input.
    #[cfg(test)]
    pub fn scripted(answers: &[&str]) -> Self {
        let (request_tx, request_rx) = std_mpsc::channel::<Prompt>();
        thread::spawn(move || for _ in request_rx {});

        let (answer_tx, answer_rx) = mpsc::channel::<Answer>(answers.len() + 1);
        for answer in answers {
            let _ = answer_tx.try_send(Ok(Some(answer.to_string())));
        }
        let _ = answer_tx.try_send(Ok(None));

        Self {
            requests: request_tx,
            answers: answer_rx,
            outstanding: false,
        }
    }

    /// Issue a request unless one is already waiting for an answer.
    pub fn request(&mut self, prompt: Prompt) -> Result<()> {
        if self.outstanding {
            return Ok(());
        }
        self.requests
            .send(prompt)
            .map_err(|_| anyhow!("Input reader stopped"))?;
        self.outstanding = true;
        Ok(())
    }

    /// Await the answer to the outstanding request. Cancel safe.
    pub async fn next(&mut self) -> Result<Option<String>> {
        let answer = self
            .answers
            .recv()
            .await
            .ok_or_else(|| anyhow!("Input reader stopped"))?;
        self.outstanding = false;
        Ok(answer?)
    }

    /// Prompt and wait for the answer.
    pub async fn ask(&mut self, prompt: Prompt) -> Result<Option<String>> {
        self.request(prompt)?;
        self.next().await
    }

    pub async fn ask_line(&mut self, label: &str) -> Result<Option<String>> {
        self.ask(Prompt::Line(label.to_string())).await
    }

    pub async fn ask_secret(&mut self, label: &str) -> Result<Option<String>> {
        self.ask(Prompt::Secret(label.to_string())).await
    }

    /// Yes/no question, `default` on an empty answer or end of input.
    pub async fn confirm(&mut self, question: &str, default: bool) -> Result<bool> {
        let hint = if default { "[Y/n]" } else { "[y/N]" };
        let answer = self.ask_line(&format!("{} {}: ", question, hint)).await?;
        Ok(parse_yes_no(answer.as_deref(), default))
    }
}

fn read_answer(prompt: &Prompt) -> Answer {
    match prompt {
        Prompt::Line(label) => {
            let mut stdout = io::stdout();
            write!(stdout, "{}", label)?;
            stdout.flush()?;

            let mut line = String::new();
            if io::stdin().lock().read_line(&mut line)? == 0 {
                return Ok(None);
            }
            Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
        }
        Prompt::Secret(label) => rpassword::prompt_password(label).map(Some),
    }
}

pub fn parse_yes_no(answer: Option<&str>, default: bool) -> bool {
    match answer.map(|a| a.trim().to_lowercase()) {
        Some(a) if a == "y" || a == "yes" => true,
        Some(a) if a == "n" || a == "no" => false,
        _ => default,
    }
}
