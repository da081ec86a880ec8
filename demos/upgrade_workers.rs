//! Upgrades the workers config of a project, asking on the terminal where
//! legacy records belong.
//!
//! ```sh
//! RUST_LOG=verconf=debug cargo run --example upgrade_workers -- path/to/project
//! ```

use std::env;

use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stdin},
    sync::Mutex,
};
use tracing_subscriber::EnvFilter;
use verconf::{
    ConfigStore, Error, LoadContext, ProjectLayout, Prompt, Question, Result, TemplateContext,
    async_trait, workers::WorkersConfig,
};

/// Reads one answer per line from stdin. An empty line takes the default.
struct TerminalPrompt {
    lines: Mutex<Lines<BufReader<Stdin>>>,
}

impl TerminalPrompt {
    fn new() -> Self {
        Self {
            lines: Mutex::new(BufReader::new(tokio::io::stdin()).lines()),
        }
    }
}

fn terminal_error(err: std::io::Error) -> Error {
    Error::Settings(format!("terminal: {err}"))
}

#[async_trait]
impl Prompt for TerminalPrompt {
    async fn select(&self, question: &Question) -> Result<String> {
        let mut lines = self.lines.lock().await;
        let mut stdout = tokio::io::stdout();

        loop {
            let default = question
                .default
                .as_deref()
                .map(|default| format!(" (default: {default})"))
                .unwrap_or_default();
            let text = format!(
                "{}\n  [{}]{default}: ",
                question.message,
                question.choices.join("/")
            );
            stdout.write_all(text.as_bytes()).await.map_err(terminal_error)?;
            stdout.flush().await.map_err(terminal_error)?;

            let Some(line) = lines.next_line().await.map_err(terminal_error)? else {
                return Err(Error::PromptUnavailable {
                    question: question.message.clone(),
                });
            };

            let answer = line.trim();
            if answer.is_empty() {
                if let Some(default) = &question.default {
                    return Ok(default.clone());
                }
            } else if question.choices.iter().any(|choice| choice == answer) {
                return Ok(answer.to_string());
            }
        }
    }
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let layout = match env::args_os().nth(1) {
        Some(root) => ProjectLayout::new(root),
        None => ProjectLayout::discover(env::current_dir()?)?,
    };

    let context = LoadContext::builder()
        .layout(layout)
        .prompt(std::sync::Arc::new(TerminalPrompt::new()))
        .template(
            TemplateContext::builder()
                .product_name("Demo")
                .cli_name("upgrade_workers")
                .build()?,
        )
        .build()?;
    let mut store = ConfigStore::init(context);

    let workers = store.load::<WorkersConfig>().await?;
    println!("{} is at the latest version", workers.path().display());

    if let Some(deals) = &workers.deals {
        for (network, deals) in deals.iter() {
            println!("  deals on {network:?}: {}", deals.len());
        }
    }
    if let Some(hosts) = &workers.hosts {
        for (env, hosts) in hosts.iter() {
            println!("  hosts in {env:?}: {}", hosts.len());
        }
    }

    Ok(())
}
