//! Helpers shared by the integration tests.
#![allow(dead_code)]

use std::{
    fs,
    path::PathBuf,
    sync::{Arc, Mutex},
};

use tempfile::TempDir;
use verconf::{
    Error, LoadContext, ProjectLayout, Prompt, Question, Result, async_trait,
    prompt::NonInteractive,
};

/// Helper to create a temporary project directory for tests
pub fn temp_project() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp directory")
}

pub fn context(project: &TempDir, prompt: Arc<dyn Prompt>) -> LoadContext {
    LoadContext::builder()
        .layout(ProjectLayout::new(project.path()))
        .prompt(prompt)
        .build()
        .expect("Failed to build load context")
}

pub fn non_interactive(project: &TempDir) -> LoadContext {
    context(project, Arc::new(NonInteractive))
}

pub fn config_path(project: &TempDir, file_name: &str) -> PathBuf {
    project.path().join(".verconf").join(file_name)
}

pub fn write_config(project: &TempDir, file_name: &str, contents: &str) -> PathBuf {
    let path = config_path(project, file_name);
    fs::create_dir_all(path.parent().expect("config path has a parent"))
        .expect("Failed to create state directory");
    fs::write(&path, contents).expect("Failed to write config file");
    path
}

pub fn read_config(project: &TempDir, file_name: &str) -> String {
    fs::read_to_string(config_path(project, file_name)).expect("Failed to read config file")
}

/// A prompt with canned answers.
///
/// Each question gets the answer of the first rule whose needle appears in
/// its message. Questions without a matching rule fail like a missing
/// terminal would. Every question is recorded.
#[derive(Default)]
pub struct ScriptedPrompt {
    rules: Vec<(String, String)>,
    asked: Mutex<Vec<Question>>,
}

impl ScriptedPrompt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn answer(mut self, needle: &str, answer: &str) -> Self {
        self.rules.push((needle.to_string(), answer.to_string()));
        self
    }

    pub fn asked(&self) -> Vec<Question> {
        self.asked.lock().expect("prompt log poisoned").clone()
    }
}

#[async_trait]
impl Prompt for ScriptedPrompt {
    async fn select(&self, question: &Question) -> Result<String> {
        self.asked
            .lock()
            .expect("prompt log poisoned")
            .push(question.clone());

        self.rules
            .iter()
            .find(|(needle, _)| question.message.contains(needle.as_str()))
            .map(|(_, answer)| answer.clone())
            .ok_or_else(|| Error::PromptUnavailable {
                question: question.message.clone(),
            })
    }
}
