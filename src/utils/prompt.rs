// src/utils/prompt.rs
//! Operator input.
//!
//! The update workflow needs two things from the person at the terminal: the
//! account password (when it is not configured) and the confirmation code sent
//! to their email. Both go through [`Prompter`] so tests can script the answers.

use crate::errors::DidError;
#[cfg(test)]
use std::collections::VecDeque;
use dialoguer::console::Term;
use dialoguer::Password;
use std::io::{self, BufRead, IsTerminal, Write};

/// Source of operator answers.
pub trait Prompter {
    /// Shows `message` and returns one line of input without the line ending.
    ///
    /// Returns [`DidError::InputClosed`] once input is exhausted.
    fn prompt(&mut self, message: &str) -> Result<String, DidError>;

    /// Like [`Prompter::prompt`], but the answer is not echoed.
    fn prompt_secret(&mut self, message: &str) -> Result<String, DidError> {
        self.prompt(message)
    }
}

/// Reads answers from stdin, writing prompts to stderr so stdout stays clean.
pub struct StdinPrompter;

impl Prompter for StdinPrompter {
    fn prompt(&mut self, message: &str) -> Result<String, DidError> {
        let mut stderr = io::stderr();
        write!(stderr, "{message}")?;
        stderr.flush()?;

        let mut input = String::new();
        if io::stdin().lock().read_line(&mut input)? == 0 {
            return Err(DidError::InputClosed);
        }
        Ok(input.trim_end_matches(['\r', '\n']).to_string())
    }

    /// Hidden entry on a terminal. Piped input is read as a plain line.
    fn prompt_secret(&mut self, message: &str) -> Result<String, DidError> {
        if !io::stdin().is_terminal() {
            return self.prompt(message);
        }
        Password::new()
            .with_prompt(message.trim_end().trim_end_matches(':'))
            .allow_empty_password(true)
            .interact_on(&Term::stderr())
            .map_err(|e| match e {
                dialoguer::Error::IO(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                    DidError::InputClosed
                }
                dialoguer::Error::IO(e) => DidError::Io(e),
            })
    }
}

/// Replays a fixed list of answers.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    answers: VecDeque<String>,
    /// Every message shown, in order.
    pub asked: Vec<String>,
    /// Messages shown through [`Prompter::prompt_secret`].
    pub secret_asked: Vec<String>,
}

#[cfg(test)]
impl ScriptedPrompter {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ScriptedPrompter {
            answers: answers.into_iter().map(Into::into).collect(),
            asked: Vec::new(),
            secret_asked: Vec::new(),
        }
    }
}

#[cfg(test)]
impl Prompter for ScriptedPrompter {
    fn prompt(&mut self, message: &str) -> Result<String, DidError> {
        self.asked.push(message.to_string());
        self.answers.pop_front().ok_or(DidError::InputClosed)
    }

    fn prompt_secret(&mut self, message: &str) -> Result<String, DidError> {
        self.secret_asked.push(message.to_string());
        self.prompt(message)
    }
}

/// Prompts until the operator enters something other than whitespace.
///
/// There is no attempt limit; closing stdin is the way out.
pub fn prompt_non_empty<P: Prompter + ?Sized>(
    prompter: &mut P,
    message: &str,
) -> Result<String, DidError> {
    loop {
        let answer = prompter.prompt(message)?;
        let answer = answer.trim();
        if !answer.is_empty() {
            return Ok(answer.to_string());
        }
        log::warn!("empty input, please try again");
    }
}

/// Hidden variant of [`prompt_non_empty`]. The answer is returned as typed.
pub fn prompt_secret_non_empty<P: Prompter + ?Sized>(
    prompter: &mut P,
    message: &str,
) -> Result<String, DidError> {
    loop {
        let answer = prompter.prompt_secret(message)?;
        if !answer.trim().is_empty() {
            return Ok(answer);
        }
        log::warn!("empty input, please try again");
    }
}
