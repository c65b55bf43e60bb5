pub mod agent;
pub mod cli;
pub mod config;
pub mod http;
pub mod llm;
pub mod probe;
pub mod trace;

use agent::{AgentConfig, ChatSession};
use anyhow::Result;
use cli::{CliArgs, TerminalInput, run_repl};
use config::{API_KEY_ENV, AppConfig, api_key_from_env};
use http::client::HttpClient;
use http::debug::HttpDebugConfig;
use llm::gemini::GeminiProvider;
use probe::PingProbe;
use std::io;
use std::process::ExitCode;
use std::time::{SystemTime, UNIX_EPOCH};
use trace::SessionTrace;

pub async fn run(args: CliArgs) -> Result<ExitCode> {
    // Variables already in the environment win over `.env`.
    dotenvy::dotenv().ok();

    let Some(api_key) = api_key_from_env() else {
        println!("{}", missing_credential_message());
        return Ok(ExitCode::FAILURE);
    };

    let config = AppConfig::load_with_path(args.config.as_deref())?;
    let session_id = generate_session_id();
    let trace = SessionTrace::create(&session_id)?;
    let http = HttpClient::new(
        reqwest::Client::new(),
        HttpDebugConfig::from_verbose(args.verbose),
    )
    .with_trace(trace.clone());
    let provider = GeminiProvider::new(
        http,
        Some(api_key),
        config.gemini_model.clone(),
        config.gemini_base_url.clone(),
    )?;

    let mut session = ChatSession::new(
        provider,
        PingProbe::new(config.probe.clone()),
        AgentConfig::default(),
    );
    let mut input = TerminalInput::new()?;
    run_repl(&mut session, &mut input, &mut io::stdout(), &trace).await?;

    Ok(ExitCode::SUCCESS)
}

fn missing_credential_message() -> String {
    format!("Error: {API_KEY_ENV} environment variable not set.")
}

fn generate_session_id() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |duration| duration.as_millis());
    format!("{millis:x}-{:x}", std::process::id())
}
