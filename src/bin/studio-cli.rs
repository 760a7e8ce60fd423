use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use studio_api::{BuildOptions, KeyMaterial, StudioClient};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "studio-cli",
    version,
    about = "Small async CLI for managing Studio appliances"
)]
struct Cli {
    /// Base URL for the API. Defaults to the public Studio user API.
    #[arg(long, env = "STUDIO_BASE_URL")]
    base_url: Option<String>,

    /// Account login sent as the basic-auth user.
    #[arg(long, env = "STUDIO_USER")]
    user: Option<String>,

    /// API key sent as the basic-auth password.
    #[arg(long, env = "STUDIO_API_KEY", requires = "user")]
    api_key: Option<String>,

    /// Emit compact JSON instead of pretty-printed output.
    #[arg(long)]
    compact: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List all appliances.
    Appliances,
    /// Show one appliance.
    Appliance { appliance_id: u64 },
    /// Clone an appliance or template.
    #[command(name = "clone")]
    CloneAppliance {
        source_id: u64,
        /// Clone option in form key=value. Repeat as needed.
        #[arg(long = "option", value_name = "KEY=VALUE")]
        options: Vec<String>,
    },
    /// Show the build status of an appliance.
    Status { appliance_id: u64 },
    /// List repositories of an appliance.
    Repositories { appliance_id: u64 },
    /// Add repositories to an appliance.
    AddRepository {
        appliance_id: u64,
        #[arg(required = true)]
        repo_ids: Vec<u64>,
    },
    /// Remove repositories from an appliance.
    RemoveRepository {
        appliance_id: u64,
        #[arg(required = true)]
        repo_ids: Vec<u64>,
    },
    /// Add the repository holding uploaded RPMs.
    AddUserRepository { appliance_id: u64 },
    /// List GPG keys of an appliance.
    GpgKeys { appliance_id: u64 },
    /// Show one GPG key.
    GpgKey { appliance_id: u64, key_id: u64 },
    /// Upload a GPG key.
    AddGpgKey(AddGpgKeyArgs),
    /// Delete a GPG key.
    DeleteGpgKey { appliance_id: u64, key_id: u64 },
    /// List selected, or installed, software.
    Software {
        appliance_id: u64,
        /// List everything installed instead of the explicit selection.
        #[arg(long)]
        installed: bool,
        /// Build to inspect; defaults to the latest one.
        #[arg(long, requires = "installed")]
        build_id: Option<u64>,
    },
    /// Search software available to an appliance.
    Search {
        appliance_id: u64,
        query: String,
        #[command(flatten)]
        options: OptionPairs,
    },
    /// Select a package.
    AddPackage(SoftwareArgs),
    /// Deselect a package.
    RemovePackage(SoftwareArgs),
    /// Select a pattern.
    AddPattern(SoftwareArgs),
    /// Deselect a pattern.
    RemovePattern(SoftwareArgs),
    /// Ban a package.
    BanPackage(SoftwareArgs),
    /// Lift a package ban.
    UnbanPackage(SoftwareArgs),
    /// Start a build.
    Build(BuildArgs),
    /// List running builds of an appliance.
    Builds { appliance_id: u64 },
    /// Show one running build.
    BuildStatus { build_id: u64 },
    /// Cancel a running build.
    CancelBuild { build_id: u64 },
}

#[derive(Debug, Args)]
struct OptionPairs {
    /// Extra parameter in form key=value. Repeat as needed.
    #[arg(long = "option", value_name = "KEY=VALUE")]
    options: Vec<String>,
}

#[derive(Debug, Args)]
struct SoftwareArgs {
    appliance_id: u64,
    name: String,
    #[command(flatten)]
    options: OptionPairs,
}

#[derive(Debug, Args)]
struct AddGpgKeyArgs {
    appliance_id: u64,
    name: String,

    /// Key text literal.
    #[arg(long, conflicts_with = "key_file", required_unless_present = "key_file")]
    key: Option<String>,

    /// Path to a key file to upload.
    #[arg(long, value_name = "PATH")]
    key_file: Option<PathBuf>,

    #[command(flatten)]
    options: OptionPairs,
}

#[derive(Debug, Args)]
struct BuildArgs {
    appliance_id: u64,

    /// Rebuild even when the version already has an image.
    #[arg(long)]
    force: bool,

    /// Build several image types at once.
    #[arg(long)]
    multi: bool,

    #[arg(long)]
    version: Option<String>,

    #[arg(long)]
    image_type: Option<String>,

    #[command(flatten)]
    options: OptionPairs,
}

/// Entry point for the async CLI.
///
/// Parses command-line arguments, builds the client, dispatches subcommands,
/// and prints JSON output.
#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut client = match &cli.base_url {
        Some(url) => StudioClient::new(url)
            .with_context(|| format!("failed to create client with base URL '{url}'"))?,
        None => StudioClient::from_default_server()
            .context("failed to create client for the default server")?,
    };

    if let (Some(user), Some(api_key)) = (&cli.user, &cli.api_key) {
        client = client.with_credentials(user.clone(), api_key.clone());
    }

    run(&client, &cli.command, cli.compact).await
}

async fn run(client: &StudioClient, command: &Command, compact: bool) -> Result<()> {
    match command {
        Command::Appliances => print_json(&client.appliances().await?, compact),
        Command::Appliance { appliance_id } => print_json(
            &client
                .appliance(*appliance_id)
                .await
                .with_context(|| format!("failed to fetch appliance {appliance_id}"))?,
            compact,
        ),
        Command::CloneAppliance { source_id, options } => {
            let options = parse_pairs(options, "--option")?;
            let appliance = client
                .clone_appliance(*source_id, &borrow_pairs(&options))
                .await
                .with_context(|| format!("failed to clone appliance {source_id}"))?;
            print_json(&appliance, compact)
        }
        Command::Status { appliance_id } => {
            print_json(&client.appliance_status(*appliance_id).await?, compact)
        }
        Command::Repositories { appliance_id } => {
            print_json(&client.repositories(*appliance_id).await?, compact)
        }
        Command::AddRepository {
            appliance_id,
            repo_ids,
        } => client
            .add_repository(*appliance_id, repo_ids.as_slice())
            .await
            .context("failed to add repositories"),
        Command::RemoveRepository {
            appliance_id,
            repo_ids,
        } => client
            .remove_repository(*appliance_id, repo_ids.as_slice())
            .await
            .context("failed to remove repositories"),
        Command::AddUserRepository { appliance_id } => client
            .add_user_repository(*appliance_id)
            .await
            .context("failed to add user repository"),
        Command::GpgKeys { appliance_id } => {
            print_json(&client.gpg_keys(*appliance_id).await?, compact)
        }
        Command::GpgKey {
            appliance_id,
            key_id,
        } => match client.gpg_key(*appliance_id, *key_id).await? {
            Some(key) => print_json(&key, compact),
            None => bail!("appliance {appliance_id} has no GPG key {key_id}"),
        },
        Command::AddGpgKey(args) => {
            let key = match (&args.key, &args.key_file) {
                (Some(text), None) => KeyMaterial::Text(text.clone()),
                (None, Some(path)) => KeyMaterial::from_path(path)
                    .with_context(|| format!("failed to read --key-file '{}'", path.display()))?,
                _ => bail!("use exactly one of --key or --key-file"),
            };
            let options = parse_pairs(&args.options.options, "--option")?;
            let key = client
                .add_gpg_key(args.appliance_id, &args.name, key, &borrow_pairs(&options))
                .await
                .with_context(|| format!("failed to upload GPG key '{}'", args.name))?;
            print_json(&key, compact)
        }
        Command::DeleteGpgKey {
            appliance_id,
            key_id,
        } => client
            .delete_gpg_key(*appliance_id, *key_id)
            .await
            .with_context(|| format!("failed to delete GPG key {key_id}")),
        Command::Software {
            appliance_id,
            installed,
            build_id,
        } => {
            let software = if *installed {
                client.installed_software(*appliance_id, *build_id).await?
            } else {
                client.selected_software(*appliance_id).await?
            };
            print_json(&software, compact)
        }
        Command::Search {
            appliance_id,
            query,
            options,
        } => {
            let options = parse_pairs(&options.options, "--option")?;
            let found = client
                .search_software(*appliance_id, query, &borrow_pairs(&options))
                .await
                .with_context(|| format!("search for '{query}' failed"))?;
            print_json(&found, compact)
        }
        Command::AddPackage(args) => {
            software_command(client, SoftwareAction::AddPackage, args).await
        }
        Command::RemovePackage(args) => {
            software_command(client, SoftwareAction::RemovePackage, args).await
        }
        Command::AddPattern(args) => {
            software_command(client, SoftwareAction::AddPattern, args).await
        }
        Command::RemovePattern(args) => {
            software_command(client, SoftwareAction::RemovePattern, args).await
        }
        Command::BanPackage(args) => {
            software_command(client, SoftwareAction::BanPackage, args).await
        }
        Command::UnbanPackage(args) => {
            software_command(client, SoftwareAction::UnbanPackage, args).await
        }
        Command::Build(args) => {
            let mut options = BuildOptions::default()
                .force(args.force)
                .multi(args.multi);
            if let Some(version) = &args.version {
                options = options.version(version.clone());
            }
            if let Some(image_type) = &args.image_type {
                options = options.image_type(image_type.clone());
            }
            for (key, value) in parse_pairs(&args.options.options, "--option")? {
                options = options.extra(key, value);
            }
            let build = client
                .start_build(args.appliance_id, &options)
                .await
                .with_context(|| format!("failed to start build of appliance {}", args.appliance_id))?;
            print_json(&build, compact)
        }
        Command::Builds { appliance_id } => {
            print_json(&client.running_builds(*appliance_id).await?, compact)
        }
        Command::BuildStatus { build_id } => {
            print_json(&client.running_build(*build_id).await?, compact)
        }
        Command::CancelBuild { build_id } => client
            .cancel_build(*build_id)
            .await
            .with_context(|| format!("failed to cancel build {build_id}")),
    }
}

#[derive(Clone, Copy, Debug)]
enum SoftwareAction {
    AddPackage,
    RemovePackage,
    AddPattern,
    RemovePattern,
    BanPackage,
    UnbanPackage,
}

/// Runs one package or pattern selection command.
async fn software_command(
    client: &StudioClient,
    action: SoftwareAction,
    args: &SoftwareArgs,
) -> Result<()> {
    let options = parse_pairs(&args.options.options, "--option")?;
    let options = borrow_pairs(&options);
    let appliance_id = args.appliance_id;
    let name = args.name.as_str();

    let result = match action {
        SoftwareAction::AddPackage => client.add_package(appliance_id, name, &options).await,
        SoftwareAction::RemovePackage => client.remove_package(appliance_id, name, &options).await,
        SoftwareAction::AddPattern => client.add_pattern(appliance_id, name, &options).await,
        SoftwareAction::RemovePattern => client.remove_pattern(appliance_id, name, &options).await,
        SoftwareAction::BanPackage => client.ban_package(appliance_id, name, &options).await,
        SoftwareAction::UnbanPackage => client.unban_package(appliance_id, name, &options).await,
    };
    result.with_context(|| format!("{action:?} '{name}' failed for appliance {appliance_id}"))
}

/// Parses repeated `key=value` arguments into owned key/value pairs.
///
/// Returns an error when a value does not include `=` or has an empty key.
fn parse_pairs(values: &[String], flag_name: &str) -> Result<Vec<(String, String)>> {
    let mut pairs = Vec::with_capacity(values.len());
    for item in values {
        let Some((key, value)) = item.split_once('=') else {
            bail!("invalid {flag_name} value '{item}': expected key=value");
        };
        if key.is_empty() {
            bail!("invalid {flag_name} value '{item}': empty key");
        }
        pairs.push((key.to_owned(), value.to_owned()));
    }
    Ok(pairs)
}

fn borrow_pairs(pairs: &[(String, String)]) -> Vec<(&str, &str)> {
    pairs
        .iter()
        .map(|(key, value)| (key.as_str(), value.as_str()))
        .collect()
}

/// Prints a value as compact or pretty-formatted JSON.
fn print_json(value: &impl Serialize, compact: bool) -> Result<()> {
    let rendered = if compact {
        serde_json::to_string(value)
    } else {
        serde_json::to_string_pretty(value)
    }
    .context("failed to render JSON")?;
    println!("{rendered}");
    Ok(())
}
