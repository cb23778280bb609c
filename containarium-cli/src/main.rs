use std::collections::HashMap;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use containarium_cli::client::{AddCollaboratorBody, AddPassthroughBody, CreateContainerBody, DeployAppBody};
use containarium_cli::{cert, recover, service, ApiClient, CliError};
use containarium_core::domain::AppState;
use containarium_runtime::RuntimeAdapter;

#[derive(Parser)]
#[command(name = "containarium", about = "Command-line client for the Containarium control plane (§6)")]
struct Cli {
    #[arg(long, env = "CONTAINARIUM_API_BASE_URL", default_value = "http://127.0.0.1:8080")]
    api_base_url: String,

    #[arg(long, env = "CONTAINARIUM_API_TOKEN")]
    api_token: String,

    #[arg(long, env = "CONTAINARIUM_LOG", default_value = "warn")]
    log_filter: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create a user container.
    Create {
        username: String,
        #[arg(long, default_value = "ubuntu:24.04")]
        image: String,
        #[arg(long)]
        cpu_cores: Option<u32>,
        #[arg(long)]
        memory_bytes: Option<u64>,
        #[arg(long)]
        disk_bytes: Option<u64>,
        #[arg(long)]
        static_ip: Option<String>,
        #[arg(long = "ssh-public-key")]
        ssh_public_keys: Vec<String>,
        #[arg(long = "label", value_parser = parse_key_value)]
        labels: Vec<(String, String)>,
        #[arg(long)]
        r#async: bool,
    },
    /// List containers, optionally filtered.
    List {
        #[arg(long)]
        username: Option<String>,
        #[arg(long)]
        state: Option<String>,
    },
    /// Delete a container by name.
    Delete { name: String },
    /// Show host runtime/system info.
    Info,
    /// Resize a container's resource limits.
    Resize {
        name: String,
        #[arg(long)]
        cpu_cores: Option<u32>,
        #[arg(long)]
        memory_bytes: Option<u64>,
        #[arg(long)]
        disk_bytes: Option<u64>,
    },
    /// Manage app deployments.
    App {
        #[command(subcommand)]
        command: AppCommand,
    },
    /// Manage L4 passthrough port forwards.
    Portforward {
        #[command(subcommand)]
        command: PortforwardCommand,
    },
    /// Mint bearer tokens.
    Token {
        #[command(subcommand)]
        command: TokenCommand,
    },
    /// Issue TLS certificates via the host's ACME client.
    Cert {
        #[command(subcommand)]
        command: CertCommand,
    },
    /// Re-assert core services and force a config write-back.
    Recover {
        #[arg(long, default_value = "/etc/containarium/recovery-manifest.toml")]
        manifest: PathBuf,
    },
    /// Manage the daemon's systemd unit.
    Service {
        #[command(subcommand)]
        command: ServiceCommand,
    },
    /// Manage container collaborators.
    Collaborator {
        #[command(subcommand)]
        command: CollaboratorCommand,
    },
    /// Manage container labels.
    Label {
        #[command(subcommand)]
        command: LabelCommand,
    },
}

#[derive(Subcommand)]
enum AppCommand {
    Deploy {
        name: String,
        container_name: String,
        image_reference: String,
        #[arg(long, default_value = "cli")]
        created_by: String,
    },
    List,
    /// Tails the deployed app's log file inside its container. There is no
    /// log-streaming API surface (§1 excludes a metrics/observability
    /// backend beyond `/healthz`); this execs directly into the container
    /// the same way the WebSocket terminal does.
    Logs {
        container_name: String,
        #[arg(long, default_value = "/var/log/app.log")]
        path: String,
        #[arg(long, default_value_t = 200)]
        lines: u32,
    },
    Start { id: uuid::Uuid },
    Stop { id: uuid::Uuid },
    Restart { id: uuid::Uuid },
    Delete { id: uuid::Uuid },
}

#[derive(Subcommand)]
enum PortforwardCommand {
    Show,
    Setup {
        external_port: u16,
        protocol: String,
        target_ip: String,
        target_port: u16,
        #[arg(long, default_value = "")]
        description: String,
    },
    Remove { port: u16, protocol: String },
}

#[derive(Subcommand)]
enum TokenCommand {
    Generate {
        subject: String,
        #[arg(long, default_value_t = 24)]
        expiry_hours: i64,
    },
}

#[derive(Subcommand)]
enum CertCommand {
    Generate {
        domain: String,
        #[arg(long, default_value = "/var/lib/containarium/certs")]
        certs_dir: PathBuf,
        #[arg(long, default_value = "/var/www/acme-challenge")]
        webroot: PathBuf,
    },
}

#[derive(Subcommand)]
enum ServiceCommand {
    Install {
        #[arg(long, default_value = "/usr/local/bin/containarium-daemon")]
        exec_path: String,
    },
    Status,
    Uninstall,
}

#[derive(Subcommand)]
enum CollaboratorCommand {
    Add {
        container_name: String,
        owner_username: String,
        collaborator_username: String,
        ssh_public_key: String,
        #[arg(long)]
        has_sudo: bool,
        #[arg(long)]
        grant_container_runtime: bool,
        #[arg(long, default_value = "cli")]
        created_by: String,
    },
    Remove { id: uuid::Uuid },
    List { container_name: String },
}

#[derive(Subcommand)]
enum LabelCommand {
    Set { name: String, key: String, value: String },
    Remove { name: String, key: String },
    List { name: String },
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected key=value, got '{raw}'"))
}

fn init_tracing(filter: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::from(1);
        }
    };

    init_tracing(&cli.log_filter);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::from(err.exit_code() as u8)
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let client = ApiClient::new(cli.api_base_url, cli.api_token);

    match cli.command {
        Command::Create {
            username,
            image,
            cpu_cores,
            memory_bytes,
            disk_bytes,
            static_ip,
            ssh_public_keys,
            labels,
            r#async,
        } => {
            let reply = client
                .create_container(&CreateContainerBody {
                    username,
                    image,
                    cpu_cores,
                    memory_bytes,
                    disk_bytes,
                    static_ip,
                    ssh_public_keys,
                    labels: labels.into_iter().collect::<HashMap<_, _>>(),
                    run_async: r#async,
                })
                .await?;
            println!("{} {}", reply.container_name, reply.state);
        }
        Command::List { username, state } => {
            let containers = client.list_containers(username.as_deref(), state.as_deref()).await?;
            for container in containers {
                println!(
                    "{}\t{}\t{:?}\t{}",
                    container.name,
                    container.owner,
                    container.state,
                    container.primary_ip.unwrap_or_else(|| "-".to_string())
                );
            }
        }
        Command::Delete { name } => {
            client.delete_container(&name).await?;
        }
        Command::Info => {
            let info = client.system_info().await?;
            println!("{}", serde_json::to_string_pretty(&info).unwrap_or_default());
        }
        Command::Resize {
            name,
            cpu_cores,
            memory_bytes,
            disk_bytes,
        } => {
            if cpu_cores.is_none() && memory_bytes.is_none() && disk_bytes.is_none() {
                return Err(CliError::Usage(
                    "resize requires at least one of --cpu-cores/--memory-bytes/--disk-bytes".into(),
                ));
            }
            client
                .resize_container(
                    &name,
                    containarium_core::domain::ResourceLimits {
                        cpu_cores,
                        memory_bytes,
                        disk_bytes,
                    },
                )
                .await?;
        }
        Command::App { command } => run_app_command(&client, command).await?,
        Command::Portforward { command } => run_portforward_command(&client, command).await?,
        Command::Token { command } => match command {
            TokenCommand::Generate { subject, expiry_hours } => {
                let token = client.generate_token(&subject, expiry_hours).await?;
                println!("{token}");
            }
        },
        Command::Cert { command } => match command {
            CertCommand::Generate {
                domain,
                certs_dir,
                webroot,
            } => {
                cert::generate(&domain, &certs_dir, &webroot).await?;
            }
        },
        Command::Recover { manifest } => {
            let manifest = recover::load_manifest(&manifest)?;
            recover::run(manifest).await?;
        }
        Command::Service { command } => match command {
            ServiceCommand::Install { exec_path } => service::install(&exec_path).await?,
            ServiceCommand::Status => println!("{}", service::status().await?),
            ServiceCommand::Uninstall => service::uninstall().await?,
        },
        Command::Collaborator { command } => run_collaborator_command(&client, command).await?,
        Command::Label { command } => run_label_command(&client, command).await?,
    }
    Ok(())
}

async fn run_app_command(client: &ApiClient, command: AppCommand) -> Result<(), CliError> {
    match command {
        AppCommand::Deploy {
            name,
            container_name,
            image_reference,
            created_by,
        } => {
            let app = client
                .deploy_app(&DeployAppBody {
                    name,
                    container_name,
                    image_reference,
                    created_by,
                })
                .await?;
            println!("{} {:?}", app.id, app.state);
        }
        AppCommand::List => {
            for app in client.list_apps().await? {
                println!("{}\t{}\t{:?}\t{}", app.id, app.name, app.state, app.container_name);
            }
        }
        AppCommand::Logs { container_name, path, lines } => {
            let runtime = Arc::new(
                containarium_runtime::CliRuntimeAdapter::discover()
                    .map_err(|e| CliError::Runtime(e.to_string()))?,
            );
            let result = runtime
                .exec(&container_name, &["tail".to_string(), "-n".to_string(), lines.to_string(), path])
                .await
                .map_err(|e| CliError::Runtime(e.to_string()))?;
            print!("{}", String::from_utf8_lossy(&result.stdout));
        }
        AppCommand::Start { id } => client.set_app_state(id, AppState::Running).await?,
        AppCommand::Stop { id } => client.set_app_state(id, AppState::Stopped).await?,
        AppCommand::Restart { id } => {
            client.set_app_state(id, AppState::Stopped).await?;
            client.set_app_state(id, AppState::Running).await?;
        }
        AppCommand::Delete { id } => client.delete_app(id).await?,
    }
    Ok(())
}

async fn run_portforward_command(client: &ApiClient, command: PortforwardCommand) -> Result<(), CliError> {
    match command {
        PortforwardCommand::Show => {
            for route in client.list_passthrough().await? {
                println!(
                    "{}/{:?}\t{}:{}\t{}",
                    route.external_port, route.protocol, route.target_ip, route.target_port, route.description
                );
            }
        }
        PortforwardCommand::Setup {
            external_port,
            protocol,
            target_ip,
            target_port,
            description,
        } => {
            client
                .add_passthrough(&AddPassthroughBody {
                    external_port,
                    protocol,
                    target_ip,
                    target_port,
                    description,
                })
                .await?;
        }
        PortforwardCommand::Remove { port, protocol } => {
            client.delete_passthrough(port, &protocol).await?;
        }
    }
    Ok(())
}

async fn run_collaborator_command(client: &ApiClient, command: CollaboratorCommand) -> Result<(), CliError> {
    match command {
        CollaboratorCommand::Add {
            container_name,
            owner_username,
            collaborator_username,
            ssh_public_key,
            has_sudo,
            grant_container_runtime,
            created_by,
        } => {
            let collaborator = client
                .add_collaborator(&AddCollaboratorBody {
                    container_name,
                    owner_username,
                    collaborator_username,
                    ssh_public_key,
                    has_sudo,
                    grant_container_runtime,
                    created_by,
                })
                .await?;
            println!("{}", collaborator.id);
        }
        CollaboratorCommand::Remove { id } => client.remove_collaborator(id).await?,
        CollaboratorCommand::List { container_name } => {
            for collaborator in client.list_collaborators(&container_name).await? {
                println!("{}\t{}\t{}", collaborator.id, collaborator.collaborator_username, collaborator.account_name);
            }
        }
    }
    Ok(())
}

async fn run_label_command(client: &ApiClient, command: LabelCommand) -> Result<(), CliError> {
    match command {
        LabelCommand::Set { name, key, value } => client.set_label(&name, &key, &value).await?,
        LabelCommand::Remove { name, key } => client.remove_label(&name, &key).await?,
        LabelCommand::List { name } => {
            for (key, value) in client.list_labels(&name).await? {
                println!("{key}={value}");
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_key_value_pairs() {
        assert_eq!(
            parse_key_value("team=payments").unwrap(),
            ("team".to_string(), "payments".to_string())
        );
        assert!(parse_key_value("no-equals-sign").is_err());
    }
}
