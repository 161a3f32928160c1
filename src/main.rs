use anyhow::Result;
use clap::{Parser, Subcommand};

use nvpanel::actions::ContainerAction;
use nvpanel::cli::{self, admin, containers};

#[derive(Debug, Parser)]
#[command(name = "nvpanel")]
#[command(about = "Control panel for NV cloud container hosting")]
#[command(version)]
struct App {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Log in and store the access token
    Login {
        #[arg(long, short)]
        username: Option<String>,
        /// Prompted for when omitted
        #[arg(long, short)]
        password: Option<String>,
    },
    /// Create an account and log in
    Register {
        #[arg(long)]
        email: Option<String>,
        #[arg(long, short)]
        username: Option<String>,
        /// Three words: last, first and middle name
        #[arg(long)]
        full_name: Option<String>,
        #[arg(long, short)]
        password: Option<String>,
    },
    /// Forget the stored access token
    Logout,
    /// Show account details and own containers
    Profile,
    /// List own containers
    Containers,
    /// Request a new container (reviewed by an administrator)
    Create {
        /// Random when omitted
        #[arg(long)]
        hostname: Option<String>,
        /// CPU cores
        #[arg(long, default_value = "1")]
        cpu: f64,
        /// RAM in GB
        #[arg(long, default_value = "1")]
        ram: f64,
        /// Storage in GB
        #[arg(long, default_value = "4")]
        storage: f64,
    },
    /// Start a container
    Start {
        id: u32,
        /// Return without waiting for the reconciliation fetch
        #[arg(long)]
        no_wait: bool,
    },
    /// Stop a container
    Stop {
        id: u32,
        #[arg(long)]
        no_wait: bool,
    },
    /// Restart a container
    Restart {
        id: u32,
        #[arg(long)]
        no_wait: bool,
    },
    /// Delete a stopped container
    Delete {
        id: u32,
        /// The container's name, typed again to confirm
        #[arg(long)]
        confirm: String,
    },
    /// Live telemetry for one container
    Watch {
        id: u32,
        /// Show the root password in clear text
        #[arg(long)]
        reveal: bool,
        /// Print a single snapshot and exit
        #[arg(long)]
        once: bool,
    },
    /// Administrator view of all containers
    Admin {
        #[command(subcommand)]
        command: AdminCommands,
    },
    /// Container request moderation (administrators)
    Tickets {
        #[command(subcommand)]
        command: TicketCommands,
    },
    /// Manage nvpanel configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Show recent activity log entries
    Activity {
        #[arg(long, default_value = "20")]
        limit: usize,
    },
    /// Serve the browser panel
    Web {
        /// Listen address, overrides `web.bind`
        #[arg(long)]
        bind: Option<String>,
    },
}

#[derive(Debug, Subcommand)]
enum AdminCommands {
    /// List every container with allocation totals
    List {
        /// Show details for one container
        #[arg(long)]
        expand: Option<u32>,
    },
    /// Run an action on any container (no confirmation gate)
    Action {
        /// start, stop, restart or delete
        action: ContainerAction,
        id: u32,
        #[arg(long)]
        no_wait: bool,
    },
}

#[derive(Debug, Subcommand)]
enum TicketCommands {
    /// List tickets (both sections unless one is selected)
    List {
        #[arg(long)]
        open: bool,
        #[arg(long)]
        closed: bool,
    },
    /// Create the container a ticket asks for
    Approve { id: String },
    /// Reject a ticket
    Reject { id: String },
}

#[derive(Debug, Subcommand)]
enum ConfigCommands {
    /// Print the effective configuration
    Show,
    /// Write an annotated config file to ~/.nvpanel/config.toml
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Set one value, e.g. `api.base_url https://...`
    Set { key: String, value: String },
    /// Restore the default configuration file
    Reset,
}

fn main() -> Result<()> {
    let app = App::parse();

    match app.command {
        Commands::Login { username, password } => cli::run_login(username, password),
        Commands::Register {
            email,
            username,
            full_name,
            password,
        } => cli::run_register(email, username, full_name, password),
        Commands::Logout => cli::run_logout(),
        Commands::Profile => cli::run_profile(),
        Commands::Containers => containers::run_containers(),
        Commands::Create {
            hostname,
            cpu,
            ram,
            storage,
        } => containers::run_create(hostname, cpu, ram, storage),
        Commands::Start { id, no_wait } => {
            containers::run_action(ContainerAction::Start, id, None, !no_wait)
        }
        Commands::Stop { id, no_wait } => {
            containers::run_action(ContainerAction::Stop, id, None, !no_wait)
        }
        Commands::Restart { id, no_wait } => {
            containers::run_action(ContainerAction::Restart, id, None, !no_wait)
        }
        Commands::Delete { id, confirm } => {
            containers::run_action(ContainerAction::Delete, id, Some(confirm.as_str()), false)
        }
        Commands::Watch { id, reveal, once } => containers::run_watch(id, reveal, once),
        Commands::Admin { command } => match command {
            AdminCommands::List { expand } => admin::run_admin_list(expand),
            AdminCommands::Action {
                action,
                id,
                no_wait,
            } => admin::run_admin_action(action, id, !no_wait),
        },
        Commands::Tickets { command } => match command {
            TicketCommands::List { open, closed } => admin::run_tickets_list(open, closed),
            TicketCommands::Approve { id } => admin::run_ticket_approve(&id),
            TicketCommands::Reject { id } => admin::run_ticket_reject(&id),
        },
        Commands::Config { command } => match command {
            ConfigCommands::Show => cli::run_config_show(),
            ConfigCommands::Init { force } => cli::run_config_init(force),
            ConfigCommands::Set { key, value } => cli::run_config_set(&key, &value),
            ConfigCommands::Reset => cli::run_config_reset(),
        },
        Commands::Activity { limit } => cli::run_activity(limit),
        Commands::Web { bind } => {
            let mut config = nvpanel::config::load();
            if let Some(bind) = bind {
                config.web.bind = bind;
            }
            nvpanel::web::serve(config)
        }
    }
}
