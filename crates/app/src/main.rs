//! Concierge - guest access for rental properties
//!
//! Command-line front end: owners manage access, guests log in with a
//! booking code, check in, and watch the door code reveal window.

use std::path::PathBuf;
use std::process::ExitCode;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use commands::{GrantChanges, PropertyChanges};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

mod commands;
mod display;
mod state;

#[derive(Parser)]
#[command(name = "concierge", version, about = "Digital concierge for rental properties")]
struct Cli {
    /// Path to concierge.toml (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create demo data in an empty database
    Seed,
    /// Log in as an owner and list properties
    OwnerLogin { token: String },
    /// Replace an owner's token with a personal one
    SetToken { token: String, new_token: String },
    /// Create an invitation token for a new owner (super admin only)
    InviteOwner {
        admin_token: String,
        name: String,
        #[arg(long)]
        email: Option<String>,
    },
    /// List all owners (super admin only)
    Owners { admin_token: String },
    /// Delete an owner with their properties and guests (super admin only)
    RemoveOwner { admin_token: String, owner_id: Uuid },
    /// Create a property pre-filled with placeholder content
    AddProperty { token: String, name: String },
    /// Change a property's details
    EditProperty {
        token: String,
        property_id: Uuid,
        #[command(flatten)]
        changes: PropertyChanges,
    },
    /// Delete a property and its guests
    RemoveProperty { token: String, property_id: Uuid },
    /// Register a guest stay and its codes
    AddGuest {
        token: String,
        property_id: Uuid,
        guest_name: String,
        booking_code: String,
        door_code: String,
        /// First night (YYYY-MM-DD)
        #[arg(long)]
        check_in: Option<NaiveDate>,
        /// Departure day (YYYY-MM-DD)
        #[arg(long)]
        check_out: Option<NaiveDate>,
    },
    /// Change a guest's details (check-in state is kept)
    EditGuest {
        token: String,
        grant_id: Uuid,
        #[command(flatten)]
        changes: GrantChanges,
    },
    /// Show the guest dashboard for a booking code
    Guest {
        booking_code: String,
        /// Print the dashboard as JSON
        #[arg(long)]
        json: bool,
    },
    /// Check a guest in and reveal the door code
    CheckIn { booking_code: String },
    /// Follow the door code countdown
    Watch { booking_code: String },
    /// Export guest history as CSV, one file per property
    Export {
        owner_token: String,
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },
}

fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let app_state = match state::AppState::open(cli.config.as_deref()) {
        Ok(state) => state,
        Err(e) => {
            tracing::error!("Failed to initialize application: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match run(&app_state, cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(state: &state::AppState, command: Command) -> concierge_core::Result<()> {
    let output = match command {
        Command::Seed => commands::seed(state)?,
        Command::OwnerLogin { token } => commands::owner_login(state, &token)?,
        Command::SetToken { token, new_token } => commands::set_token(state, &token, &new_token)?,
        Command::InviteOwner {
            admin_token,
            name,
            email,
        } => commands::invite_owner(state, &admin_token, &name, email.as_deref())?,
        Command::Owners { admin_token } => commands::list_owners(state, &admin_token)?,
        Command::RemoveOwner {
            admin_token,
            owner_id,
        } => commands::remove_owner(state, &admin_token, owner_id)?,
        Command::AddProperty { token, name } => commands::add_property(state, &token, &name)?,
        Command::EditProperty {
            token,
            property_id,
            changes,
        } => commands::edit_property(state, &token, property_id, changes)?,
        Command::RemoveProperty { token, property_id } => {
            commands::remove_property(state, &token, property_id)?
        }
        Command::AddGuest {
            token,
            property_id,
            guest_name,
            booking_code,
            door_code,
            check_in,
            check_out,
        } => {
            let details = GrantChanges {
                guest_name: None,
                booking_code: Some(booking_code),
                door_code: Some(door_code),
                check_in,
                check_out,
            };
            commands::add_grant(state, &token, property_id, &guest_name, details)?
        }
        Command::EditGuest {
            token,
            grant_id,
            changes,
        } => commands::edit_grant(state, &token, grant_id, changes)?,
        Command::Guest { booking_code, json } => commands::guest(state, &booking_code, json)?,
        Command::CheckIn { booking_code } => commands::check_in(state, &booking_code)?,
        Command::Export { owner_token, out_dir } => commands::export(state, &owner_token, &out_dir)?
            .iter()
            .map(|p| format!("Wrote {}", p.display()))
            .collect::<Vec<_>>()
            .join("\n"),
        Command::Watch { booking_code } => {
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(commands::watch(state, &booking_code))?;
            return Ok(());
        }
    };

    println!("{output}");
    Ok(())
}
