// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use redshift_provider::SchemaGroupId;
use redshift_provider::cli::{self, CliError, Operation};
use redshift_provider::client::Client;
use redshift_provider::config::ProfilesConfig;
use redshift_provider::error::ProviderError;
use tracing_subscriber::EnvFilter;

/// Manages default table privileges of Redshift groups
#[derive(Parser, Debug)]
#[command(name = "redshift-provider", version)]
#[command(about = "Reconcile schema group privileges against a Redshift cluster")]
struct Args {
    /// Path to the profiles file (default: ./profiles.toml)
    #[arg(long, value_name = "PATH", global = true, env = "REDSHIFT_PROVIDER_PROFILES")]
    profiles_file: Option<PathBuf>,

    /// Connection profile to use (from the profiles file)
    #[arg(short, long, global = true)]
    profile: Option<String>,

    /// Enable verbose output for debugging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the resource schema
    Schema,

    /// Print the server version and the connected user
    Debug,

    /// Report whether the resource still exists
    Exists {
        #[arg(value_name = "ID")]
        id: SchemaGroupId,
    },

    /// Grant the declared privileges
    ///
    /// Example:
    ///   redshift-provider create --config analysts.toml
    Create {
        /// TOML file with schema_id, group_id and the privilege flags
        #[arg(long, value_name = "FILE")]
        config: PathBuf,
    },

    /// Refresh the state of a resource
    Read {
        #[arg(value_name = "ID")]
        id: SchemaGroupId,
    },

    /// Converge an existing resource to the declared privileges
    Update {
        #[arg(value_name = "ID")]
        id: SchemaGroupId,

        /// TOML file with schema_id, group_id and the privilege flags
        #[arg(long, value_name = "FILE")]
        config: PathBuf,
    },

    /// Revoke every managed privilege of the group on the schema
    Delete {
        #[arg(value_name = "ID")]
        id: SchemaGroupId,
    },

    /// Adopt privileges that already exist
    ///
    /// Example:
    ///   redshift-provider import 100233_101
    Import {
        #[arg(value_name = "ID")]
        id: SchemaGroupId,
    },
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(args).await {
        cli::display_error(&e);
    }
}

async fn run(args: Args) -> Result<(), CliError> {
    let operation = match args.command {
        Command::Schema => return print(&cli::schema()?),
        Command::Debug => {
            let client = connect(args.profiles_file.as_deref(), args.profile.as_deref()).await?;
            let (version, role) = client.server_info().await?;
            let profile = client.profile();
            println!("profile:  {}", profile.name);
            println!("host:     {}:{}", profile.host, profile.port);
            println!("database: {}", profile.database);
            println!("user:     {role}");
            println!("version:  {version}");
            return Ok(());
        }
        Command::Exists { id } => Operation::Exists(id),
        Command::Create { config } => Operation::Create(cli::load_declaration(&config)?),
        Command::Read { id } => Operation::Read(id),
        Command::Update { id, config } => Operation::Update(id, cli::load_declaration(&config)?),
        Command::Delete { id } => Operation::Delete(id),
        Command::Import { id } => Operation::Import(id),
    };

    let mut client = connect(args.profiles_file.as_deref(), args.profile.as_deref()).await?;
    let output = cli::run(&mut client, operation).await?;
    print(&output)
}

async fn connect(
    profiles_file: Option<&Path>,
    profile: Option<&str>,
) -> Result<Client, CliError> {
    let profile = ProfilesConfig::load_profile(profiles_file, profile)
        .map_err(ProviderError::Config)?;
    Ok(Client::connect(profile).await?)
}

fn print(output: &serde_json::Value) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(output)?);
    Ok(())
}
