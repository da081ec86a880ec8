//! Operator prompts used by migrations that cannot be resolved mechanically.
//!
//! The engine never talks to a terminal itself. Migrations receive a
//! [`Prompt`] capability and ask it [`Question`]s whose answers are limited to
//! a fixed set of choices. Front ends implement `Prompt` for their UI; tests
//! implement it with canned answers.

use async_trait::async_trait;

use crate::error::{Error, Result};

/// A question with a closed set of valid answers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    pub message: String,
    pub choices: Vec<String>,
    /// Answer to preselect, always one of `choices`.
    pub default: Option<String>,
}

#[async_trait]
pub trait Prompt: Send + Sync {
    /// Asks the operator and returns the chosen answer.
    ///
    /// May block for as long as the operator takes.
    async fn select(&self, question: &Question) -> Result<String>;
}

/// A value that can be offered as an answer to a [`Question`].
pub trait Choice: Copy + Eq + std::hash::Hash + Send + Sync + 'static {
    fn all() -> &'static [Self];

    fn as_str(&self) -> &'static str;
}

/// Asks `message` and maps the answer back onto `C`.
pub async fn ask<C: Choice>(
    prompt: &dyn Prompt,
    message: impl Into<String>,
    suggested: Option<C>,
) -> Result<C> {
    let question = Question {
        message: message.into(),
        choices: C::all().iter().map(|choice| choice.as_str().to_string()).collect(),
        default: suggested.map(|choice| choice.as_str().to_string()),
    };

    let answer = prompt.select(&question).await?;
    let answer = answer.trim();

    C::all()
        .iter()
        .copied()
        .find(|choice| choice.as_str() == answer)
        .ok_or_else(|| Error::InvalidAnswer {
            answer: answer.to_string(),
            choices: question.choices,
        })
}

/// Refuses every question. Loads that need an operator fail instead of
/// guessing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NonInteractive;

#[async_trait]
impl Prompt for NonInteractive {
    async fn select(&self, question: &Question) -> Result<String> {
        Err(Error::PromptUnavailable {
            question: question.message.clone(),
        })
    }
}

/// Takes the suggested answer of every question that has one.
#[derive(Debug, Default, Clone, Copy)]
pub struct AcceptDefaults;

#[async_trait]
impl Prompt for AcceptDefaults {
    async fn select(&self, question: &Question) -> Result<String> {
        question
            .default
            .clone()
            .ok_or_else(|| Error::PromptUnavailable {
                question: question.message.clone(),
            })
    }
}
