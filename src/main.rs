mod cli;

use clap::Parser;
use cli::{Cli, RunMode};
use serde_json::json;
use std::error::Error;
use std::fs;
use std::io::{self, Read};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use sundial_agent::agent::{Agent, AgentOptions};
use sundial_agent::client::{ChatClient, ClientConfig};
use sundial_agent::config::{AppConfig, Credentials};
use sundial_agent::model::GeminiClient;
use sundial_agent::stdio;
use sundial_agent::telemetry::ConversationTracker;
use sundial_agent::tooling::{
    LazyToolBinder, LocalToolProvider, ToolProvider, UnlinkedServerProvider,
};
use tracing::{debug, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenvy::dotenv().ok();
    init_tracing();
    info!("Starting sundial-agent");
    let cli = Cli::parse();
    debug!(?cli.mode, config = ?cli.config, system = ?cli.system, session = ?cli.session, "CLI arguments parsed");

    let config_path = cli.config.as_deref().map(Path::new);
    let file_config = AppConfig::load(config_path)?;
    if let Some(path) = config_path {
        info!(path = %path.display(), "Loaded configuration from file");
    } else {
        info!("Loaded configuration using default path or defaults");
    }

    // Credentials are checked before anything is spawned or sent.
    let credentials = Credentials::from_env()?;
    let model_client = GeminiClient::new(credentials.api_key);

    let mut client_config = ClientConfig::new(
        cli.model.clone().unwrap_or_else(|| file_config.model.clone()),
    )
    .with_prompt_template(file_config.prompt_template.clone());
    if let Some(system_prompt) = cli.system.clone().or(file_config.system_prompt.clone()) {
        client_config = client_config.with_system_prompt(system_prompt);
    }
    let client = Arc::new(ChatClient::new(model_client, client_config));

    // Tool servers need an embedding that links a transport bridge; this
    // binary ships the built-in tools only. A configured server therefore
    // fails acquisition, and `require_tools` decides whether that degrades
    // the run or aborts it.
    let tool_provider: Arc<dyn ToolProvider> = match &file_config.server {
        Some(server) => {
            warn!(
                server = server.name.as_str(),
                "Tool server configured but no transport bridge is linked in this build"
            );
            Arc::new(UnlinkedServerProvider::new(server.name.clone()))
        }
        None => Arc::new(LocalToolProvider),
    };

    let mut binder = LazyToolBinder::new(tool_provider);
    if let Some(secs) = file_config
        .server
        .as_ref()
        .and_then(|server| server.load_timeout_secs)
    {
        binder = binder.with_timeout(Duration::from_secs(secs));
    }
    let binder = Arc::new(binder);

    let tracker = Arc::new(if file_config.telemetry {
        ConversationTracker::enabled()
    } else {
        ConversationTracker::disabled()
    });
    let agent = Arc::new(
        Agent::new(client.clone(), binder.clone())
            .with_tracker(tracker)
            .require_tools(file_config.require_tools),
    );

    info!(mode = ?cli.mode, "Running agent in selected mode");
    match cli.mode {
        RunMode::Cli => {
            let prompt = load_prompt(&cli)?;
            let mut options = AgentOptions::default();
            options.session_id = cli.session.clone();
            info!("Dispatching single prompt via CLI mode");

            let outcome = agent.run(prompt, options).await;
            // Teardown happens on the failure path too.
            agent.shutdown().await;
            let outcome = outcome?;

            let output = json!({
                "session_id": outcome.session_id,
                "content": outcome.response,
                "tool_steps": outcome.steps,
                "degraded": outcome.degraded,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        RunMode::Stdio => {
            info!("Entering STDIO mode; awaiting JSON line input");
            let result = stdio::run(client.clone(), agent.clone()).await;
            agent.shutdown().await;
            result?;
        }
    }
    info!("Agent execution finished");
    Ok(())
}

fn init_tracing() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_level(true)
            .init();
    });
}

fn load_prompt(cli: &Cli) -> Result<String, Box<dyn Error>> {
    if let Some(path) = &cli.prompt_file {
        info!(path = %path, "Loading prompt from file");
        let content = fs::read_to_string(path)?;
        return Ok(normalize_prompt(content));
    }

    if !cli.prompt.is_empty() {
        info!("Using prompt provided through CLI arguments");
        let joined = cli.prompt.join(" ");
        return Ok(normalize_prompt(joined));
    }

    if atty::isnt(atty::Stream::Stdin) {
        info!("Reading prompt from standard input");
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        return Ok(normalize_prompt(buffer));
    }

    warn!("Prompt not provided via arguments, file, or stdin");
    Err("prompt required via arguments, file, or stdin".into())
}

fn normalize_prompt(prompt: String) -> String {
    prompt.trim().to_string()
}
