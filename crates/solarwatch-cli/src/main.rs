//! Solarwatch CLI - monitor solar facilities from the terminal.
//!
//! Every command runs through the same authenticated request pipeline the
//! dashboard uses; when the session ends the CLI is sent back to login.

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{debug, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use solarwatch_core::api::{FacilityUpdate, HttpTransport, PipelineError, Upload};
use solarwatch_core::auth::{MemoryTokenStore, SessionManager, TokenStore};
use solarwatch_core::{Config, NavigationPort, RequestPipeline, Route, Router, SolarApi};

#[derive(Parser)]
#[command(name = "solarwatch", version, about = "Monitor solar facilities")]
struct Cli {
    /// GraphQL endpoint (overrides the config file)
    #[arg(long, env = "SOLARWATCH_BACKEND_URL", global = true)]
    backend_url: Option<String>,

    /// Keep the session in memory only
    #[arg(long, global = true)]
    ephemeral: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sign in with email and password
    Login {
        #[arg(long)]
        email: Option<String>,
    },
    /// Create an account and sign in
    Signup {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
    },
    /// Sign out and forget the stored session
    Logout,
    /// Show the signed-in user
    Whoami,
    /// List your facilities
    Facilities,
    /// Show a facility and its solar data
    Show { id: String },
    /// Register a new facility
    Create {
        #[arg(long)]
        name: String,
        /// Nominal power in kW
        #[arg(long)]
        power: f64,
        /// CSV file with solar data
        #[arg(long)]
        csv: Option<PathBuf>,
    },
    /// Change a facility
    Update {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        power: Option<f64>,
        #[arg(long)]
        csv: Option<PathBuf>,
    },
    /// Delete a facility
    Delete { id: String },
}

impl Command {
    /// Route the dashboard would be on while running this command
    fn route(&self) -> Route {
        match self {
            Command::Login { .. } | Command::Signup { .. } | Command::Logout => Route::Login,
            Command::Whoami | Command::Facilities | Command::Delete { .. } => Route::Dashboard,
            Command::Show { id } => Route::Facility(id.clone()),
            Command::Create { .. } => Route::CreateFacility,
            Command::Update { id, .. } => Route::EditFacility(id.clone()),
        }
    }

    /// Commands answered from the stored session, with no backend involved
    fn is_local(&self) -> bool {
        matches!(self, Command::Logout | Command::Whoami)
    }
}

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    init_tracing();
    let cli = Cli::parse();

    let mut config = Config::load()?;
    if let Some(url) = cli.backend_url.clone() {
        config.override_backend_url(url);
    }

    let store: Arc<dyn TokenStore> = if cli.ephemeral {
        Arc::new(MemoryTokenStore::new())
    } else {
        config.token_store()?
    };

    let router = Arc::new(Router::new(cli.command.route()));
    let mut routes = router.subscribe();
    let redirect_expected = matches!(cli.command, Command::Logout);

    let result = if cli.command.is_local() {
        run_local(&SessionManager::new(store, router.clone()), cli.command)
    } else {
        let transport = HttpTransport::new(config.backend_url()?, config.request_timeout())?;
        debug!(backend = transport.endpoint(), "Pipeline ready");
        let pipeline = Arc::new(RequestPipeline::standard(
            store.clone(),
            router.clone(),
            Arc::new(transport),
        ));
        let api = SolarApi::new(pipeline, store, router.clone());
        run(&api, &mut config, cli.command).await
    };

    if let Err(e) = result {
        match e.downcast_ref::<PipelineError>() {
            Some(pe) if pe.is_session_error() => info!(error = %pe, "Session ended"),
            _ => return Err(e),
        }
    }

    if !redirect_expected && routes.has_changed().unwrap_or(false) && router.current_route().is_login() {
        eprintln!("Your session has ended. Run `solarwatch login` to sign in again.");
    }
    Ok(())
}

fn run_local(sessions: &SessionManager, command: Command) -> Result<()> {
    match command {
        Command::Logout => {
            sessions.logout();
            println!("Signed out.");
        }
        Command::Whoami => match sessions.current_session()? {
            Some(session) if session.is_expired() => {
                let user = session.user();
                println!("{} <{}> ({}), session expired", user.name, user.email, user.id);
            }
            Some(session) => {
                let user = session.user();
                println!(
                    "{} <{}> ({}), session expires in {} min",
                    user.name,
                    user.email,
                    user.id,
                    session.minutes_until_expiry()
                );
            }
            None => println!("Not signed in."),
        },
        _ => anyhow::bail!("command needs the backend"),
    }
    Ok(())
}

async fn run(api: &SolarApi, config: &mut Config, command: Command) -> Result<()> {
    match command {
        Command::Login { email } => {
            let email = match email.or_else(|| config.last_email.clone()) {
                Some(email) => email,
                None => prompt("Email: ")?,
            };
            let password = rpassword::prompt_password("Password: ")?;
            let user = api.login(&email, &password).await?;
            remember_email(config, &user.email);
            println!("Welcome, {}!", user.name);
        }
        Command::Signup { name, email } => {
            let password = rpassword::prompt_password("Password: ")?;
            let user = api.signup(&name, &email, &password).await?;
            remember_email(config, &user.email);
            println!("Welcome, {}!", user.name);
        }
        Command::Logout => run_local(api.sessions(), Command::Logout)?,
        Command::Whoami => run_local(api.sessions(), Command::Whoami)?,
        Command::Facilities => {
            let facilities = api.facilities().await?;
            if facilities.is_empty() {
                println!("No facilities yet. Create one with `solarwatch create`.");
            }
            for f in facilities {
                println!("{:<26} {:<32} {:>10.1} kW", f.id, f.name, f.nominal_power);
            }
        }
        Command::Show { id } => {
            let f = api.facility(&id).await?;
            println!("{}", f.name);
            println!("Nominal Power: {} kW", f.nominal_power);
            if !f.has_solar_data() {
                println!("No solar data available. Update the facility with a CSV file.");
                return Ok(());
            }
            if let Some(peak) = f.peak_power_kw() {
                println!("Peak Power: {:.2} kW", peak);
            }
            if let Some(energy) = f.energy_produced_kwh() {
                println!("Energy Produced: {:.2} kWh", energy);
            }
            println!();
            println!("{:<26} {:>18} {:>14}", "Timestamp", "Active Power (kW)", "Energy (kWh)");
            for r in &f.solar_data {
                println!(
                    "{:<26} {:>18.2} {:>14.2}",
                    r.timestamp.format("%Y-%m-%d %H:%M:%S"),
                    r.active_power_kw,
                    r.energy_kwh
                );
            }
        }
        Command::Create { name, power, csv } => {
            let upload = csv.as_deref().map(read_upload).transpose()?;
            let f = api.create_facility(&name, power, upload).await?;
            println!("Created facility {} ({})", f.name, f.id);
        }
        Command::Update { id, name, power, csv } => {
            let update = FacilityUpdate {
                name,
                nominal_power: power,
                file: csv.as_deref().map(read_upload).transpose()?,
            };
            let f = api.update_facility(&id, update).await?;
            println!("Updated facility {} ({})", f.name, f.id);
        }
        Command::Delete { id } => {
            if api.delete_facility(&id).await? {
                println!("Deleted facility {}", id);
            } else {
                println!("Facility {} was not deleted", id);
            }
        }
    }
    Ok(())
}

fn read_upload(path: &std::path::Path) -> Result<Upload> {
    Upload::from_path(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn remember_email(config: &mut Config, email: &str) {
    config.last_email = Some(email.to_string());
    if let Err(e) = config.save() {
        tracing::warn!(error = %e, "Failed to save config");
    }
}

fn prompt(label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}
