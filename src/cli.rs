use clap::{Parser, ValueEnum};

#[derive(Parser, Debug)]
#[command(
    name = "sundial-agent",
    version,
    about = "LLM agent with lazily bound tool servers"
)]
pub struct Cli {
    #[arg(long)]
    pub config: Option<String>,
    #[arg(long)]
    pub model: Option<String>,
    #[arg(long)]
    pub system: Option<String>,
    #[arg(long)]
    pub session: Option<String>,
    #[arg(long)]
    pub prompt_file: Option<String>,
    #[arg(long, value_enum, default_value_t = RunMode::Cli)]
    pub mode: RunMode,
    #[arg()]
    pub prompt: Vec<String>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum RunMode {
    Cli,
    Stdio,
}
