//! Operator console for the counter gate.
//!
//! Session identity and limiter records persist in a JSON file between runs,
//! standing in for the browser tab's session storage.

use std::io::BufRead;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use secrecy::SecretString;

use counter_gate::config::{config_from_env, load_config, GateConfig};
use counter_gate::gate::{
    GateError, LoginOutcome, LoginWorkflow, Phase, SessionStore, VerificationOutcome,
    VerificationWorkflow,
};
use counter_gate::observability::logging;
use counter_gate::remote::PostgrestClient;
use counter_gate::security::rate_limit::{LOGIN_BUCKET, VERIFY_BUCKET};
use counter_gate::security::RateLimiter;
use counter_gate::storage::{FileStore, KeyValueStore};

#[derive(Parser)]
#[command(name = "counter-cli")]
#[command(about = "Sign in and verify access codes at the counter", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long, env = "GATE_CONFIG")]
    config: Option<PathBuf>,

    /// Override the session state file.
    #[arg(long)]
    state: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in as a counter operator
    Login {
        #[arg(long)]
        email: String,
        /// Read from stdin when neither the flag nor COUNTER_PASSWORD is set
        #[arg(long, env = "COUNTER_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Verify and consume an access code
    Verify { code: String },
    /// Show the signed-in operator
    Whoami,
    /// Forget the operator identity
    Logout,
}

fn limiter(config: &GateConfig, name: &str, store: &Arc<dyn KeyValueStore>) -> RateLimiter {
    let buckets = &config.rate_limit;
    if !buckets.enabled {
        return RateLimiter::disabled(name);
    }
    let bucket = if name == LOGIN_BUCKET {
        &buckets.login
    } else {
        &buckets.verify_code
    };
    RateLimiter::from_config(name, bucket, store.clone())
}

fn read_password() -> Result<SecretString, std::io::Error> {
    eprint!("Password: ");
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    Ok(SecretString::from(line.trim_end_matches(['\r', '\n']).to_string()))
}

fn print_outcome(outcome: &VerificationOutcome) {
    println!("{}", outcome.headline());
    if !outcome.shows_subject() {
        return;
    }
    let subject = &outcome.subject;
    let or_dash = |v: &Option<String>| v.clone().unwrap_or_else(|| "-".to_string());
    println!("  Name:        {}", or_dash(&subject.name));
    println!("  Email:       {}", or_dash(&subject.email));
    println!(
        "  Consumed at: {}",
        outcome
            .consumed_at
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| "-".to_string())
    );
    println!(
        "  Invitation:  {}",
        outcome
            .invitation
            .label()
            .unwrap_or_else(|| "NOT AVAILABLE".to_string())
    );
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => config_from_env()?,
    };
    logging::init_logging(&config.observability.log_level);

    let state_path = cli
        .state
        .unwrap_or_else(|| PathBuf::from(&config.session.state_path));
    let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::new(state_path));
    let session = SessionStore::new(store.clone());

    match cli.command {
        Commands::Login { email, password } => {
            let password = match password {
                Some(p) => SecretString::from(p),
                None => read_password()?,
            };
            let remote = Arc::new(PostgrestClient::from_config(&config.backend)?);
            let login = LoginWorkflow::new(remote, limiter(&config, LOGIN_BUCKET, &store), session);
            match login.login(&email, &password).await {
                Ok(LoginOutcome::AlreadySignedIn(identity)) => {
                    println!("Already signed in as {}", identity.email());
                }
                Ok(LoginOutcome::SignedIn(identity)) => {
                    println!("Signed in as {}", identity.email());
                }
                Err(e) => {
                    eprintln!("{}", e.user_message());
                    return Ok(ExitCode::FAILURE);
                }
            }
        }
        Commands::Verify { code } => {
            let remote = Arc::new(PostgrestClient::from_config(&config.backend)?);
            let mut workflow =
                VerificationWorkflow::new(remote, limiter(&config, VERIFY_BUCKET, &store), session);
            workflow.set_input(&code);
            match workflow.submit().await {
                Phase::Accepted(outcome) => print_outcome(outcome),
                Phase::Denied(err) => {
                    match err {
                        GateError::RemoteRejected(outcome) => print_outcome(outcome),
                        other => eprintln!("{}", other.user_message()),
                    }
                    return Ok(ExitCode::FAILURE);
                }
                Phase::Errored(err) => {
                    eprintln!("{}", err.user_message());
                    return Ok(ExitCode::FAILURE);
                }
                Phase::Idle | Phase::Submitting { .. } => {
                    eprintln!("Nothing was submitted.");
                    return Ok(ExitCode::FAILURE);
                }
            }
        }
        Commands::Whoami => match session.current() {
            Some(identity) => println!("{}", identity.email()),
            None => {
                eprintln!("Not signed in.");
                return Ok(ExitCode::FAILURE);
            }
        },
        Commands::Logout => {
            session.clear()?;
            println!("Signed out.");
        }
    }

    Ok(ExitCode::SUCCESS)
}
