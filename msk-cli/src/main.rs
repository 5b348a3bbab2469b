mod json;

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use colored::Colorize;
use tokio_util::sync::CancellationToken;

use msk_core::provider::{Provider, ProviderError};
use msk_core::resource::ResourceId;
use msk_core::waiter::{WaitFailure, Waiter};
use msk_provider_aws::cloudformation::{
    change_set_created, stack_created, stack_deleted, stack_set_operation_succeeded,
    stack_updated, type_registration_complete,
};
use msk_provider_aws::policy::OperationKind;
use msk_provider_aws::{MskProvider, ProviderConfig};

#[derive(Parser)]
#[command(name = "msk-provider")]
#[command(about = "Manage CloudFormation stacks and MSK Connect connectors", long_about = None)]
struct Cli {
    /// Provider configuration file (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// AWS region, overriding the configuration file
    #[arg(long, global = true, env = "AWS_REGION")]
    region: Option<String>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the resource described by a JSON file
    Create {
        /// Path to resource file
        file: PathBuf,
    },
    /// Update an existing resource to match a JSON file
    Update {
        /// Path to resource file
        file: PathBuf,

        /// Stack ID or connector ARN of the existing resource
        identifier: String,
    },
    /// Read the current state of a resource
    Read {
        resource_type: String,
        name: String,
        identifier: String,
    },
    /// Delete a resource and wait until it is gone
    Delete {
        resource_type: String,
        name: String,
        identifier: String,
    },
    /// Wait for an operation started elsewhere
    Wait {
        #[command(subcommand)]
        command: WaitCommands,
    },
}

#[derive(Subcommand)]
enum WaitCommands {
    /// Wait for a stack creation
    StackCreated {
        #[arg(long)]
        stack_id: String,
        #[arg(long)]
        request_token: String,
    },
    /// Wait for a stack update
    StackUpdated {
        #[arg(long)]
        stack_id: String,
        #[arg(long)]
        request_token: String,
    },
    /// Wait for a stack deletion
    StackDeleted {
        #[arg(long)]
        stack_id: String,
        #[arg(long)]
        request_token: String,
    },
    /// Wait for a change set to be created
    ChangeSet {
        #[arg(long)]
        stack_id: String,
        #[arg(long)]
        name: String,
    },
    /// Wait for a stack set operation to succeed
    StackSetOperation {
        #[arg(long)]
        stack_set: String,
        #[arg(long)]
        operation_id: String,
    },
    /// Wait for a resource type registration
    TypeRegistration {
        #[arg(long)]
        token: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logger(cli.verbose);

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("Interrupted, cancelling");
            on_interrupt.cancel();
        }
    });

    let result = match load_config(cli.config.as_deref(), cli.region) {
        Ok(config) => {
            let provider = MskProvider::new(config)
                .await
                .with_waiter(Waiter::new().with_cancellation(cancel));
            run(&provider, cli.command).await
        }
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn init_logger(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn load_config(path: Option<&Path>, region: Option<String>) -> Result<ProviderConfig, String> {
    let mut config = match path {
        Some(path) => ProviderConfig::from_file(path).map_err(|e| e.to_string())?,
        None => ProviderConfig::default(),
    };
    if let Some(region) = region {
        config = config.with_region(region);
    }
    config.validate().map_err(|e| e.to_string())?;
    Ok(config)
}

async fn run(provider: &MskProvider, command: Commands) -> Result<(), String> {
    match command {
        Commands::Create { file } => {
            let resource = read_resource_file(&file)?;
            let state = provider.create(&resource).await.map_err(provider_error)?;
            println!("{}", format!("Created {}", resource.id).green());
            print_json(&json::state_to_json(&state))
        }
        Commands::Update { file, identifier } => {
            let resource = read_resource_file(&file)?;
            let current = provider
                .read(&resource.id, Some(&identifier))
                .await
                .map_err(provider_error)?;
            if !current.exists {
                return Err(format!("{} ({}) does not exist", resource.id, identifier));
            }
            let state = provider
                .update(&resource.id, &identifier, &current, &resource)
                .await
                .map_err(provider_error)?;
            println!("{}", format!("Updated {}", resource.id).green());
            print_json(&json::state_to_json(&state))
        }
        Commands::Read {
            resource_type,
            name,
            identifier,
        } => {
            let id = ResourceId::new(resource_type, name);
            let state = provider
                .read(&id, Some(&identifier))
                .await
                .map_err(provider_error)?;
            print_json(&json::state_to_json(&state))
        }
        Commands::Delete {
            resource_type,
            name,
            identifier,
        } => {
            let id = ResourceId::new(resource_type, name);
            provider
                .delete(&id, &identifier)
                .await
                .map_err(provider_error)?;
            println!("{}", format!("Deleted {}", id).green());
            Ok(())
        }
        Commands::Wait { command } => run_wait(provider, command).await,
    }
}

async fn run_wait(provider: &MskProvider, command: WaitCommands) -> Result<(), String> {
    let waiter = provider.waiter();
    let api = provider.cloudformation();

    let output = match command {
        WaitCommands::StackCreated {
            stack_id,
            request_token,
        } => {
            let timeout = provider.timeout(OperationKind::StackCreate);
            let stack = stack_created(waiter, api, &stack_id, &request_token, timeout)
                .await
                .map_err(wait_error)?;
            serde_json::json!({ "stack_id": stack.stack_id, "status": stack.status.to_string() })
        }
        WaitCommands::StackUpdated {
            stack_id,
            request_token,
        } => {
            let timeout = provider.timeout(OperationKind::StackUpdate);
            let stack = stack_updated(waiter, api, &stack_id, &request_token, timeout)
                .await
                .map_err(wait_error)?;
            serde_json::json!({ "stack_id": stack.stack_id, "status": stack.status.to_string() })
        }
        WaitCommands::StackDeleted {
            stack_id,
            request_token,
        } => {
            let timeout = provider.timeout(OperationKind::StackDelete);
            let status = stack_deleted(waiter, api, &stack_id, &request_token, timeout)
                .await
                .map_err(wait_error)?
                .map(|stack| stack.status.to_string());
            serde_json::json!({ "stack_id": stack_id, "status": status })
        }
        WaitCommands::ChangeSet { stack_id, name } => {
            let timeout = provider.timeout(OperationKind::ChangeSetCreate);
            let change_set = change_set_created(waiter, api, &stack_id, &name, timeout)
                .await
                .map_err(wait_error)?;
            serde_json::json!({
                "change_set_id": change_set.change_set_id,
                "change_set_name": change_set.change_set_name,
                "status": change_set.status.to_string(),
            })
        }
        WaitCommands::StackSetOperation {
            stack_set,
            operation_id,
        } => {
            let timeout = provider.timeout(OperationKind::StackSetOperation);
            let operation =
                stack_set_operation_succeeded(waiter, api, &stack_set, &operation_id, timeout)
                    .await
                    .map_err(wait_error)?;
            serde_json::json!({
                "operation_id": operation.operation_id,
                "action": operation.action,
                "status": operation.status.to_string(),
            })
        }
        WaitCommands::TypeRegistration { token } => {
            let timeout = provider.timeout(OperationKind::TypeRegistration);
            let registration = type_registration_complete(waiter, api, &token, timeout)
                .await
                .map_err(wait_error)?;
            serde_json::json!({
                "status": registration.status.to_string(),
                "type_arn": registration.type_arn,
                "type_version_arn": registration.type_version_arn,
            })
        }
    };
    print_json(&output)
}

const STILL_RUNNING: &str = "the operation may still be in progress";

fn provider_error(e: ProviderError) -> String {
    let mut message = if e.is_timeout() {
        format!("{} ({})", e, STILL_RUNNING)
    } else {
        e.to_string()
    };
    if let Some(identifier) = &e.identifier {
        message.push_str(&format!("\nResource identifier: {}", identifier));
    }
    message
}

fn wait_error<S, R>(failure: WaitFailure<S, R>) -> String {
    if failure.error.is_timeout() {
        format!("{} ({})", failure, STILL_RUNNING)
    } else {
        failure.to_string()
    }
}

fn read_resource_file(file: &Path) -> Result<msk_core::resource::Resource, String> {
    let content = fs::read_to_string(file)
        .map_err(|e| format!("Failed to read {}: {}", file.display(), e))?;
    json::parse_resource(&content).map_err(|e| format!("{}: {}", file.display(), e))
}

fn print_json(value: &serde_json::Value) -> Result<(), String> {
    let content = serde_json::to_string_pretty(value).map_err(|e| e.to_string())?;
    println!("{}", content);
    Ok(())
}
