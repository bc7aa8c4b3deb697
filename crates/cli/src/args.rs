use clap::{Args as ClapArgs, CommandFactory, Parser, Subcommand, ValueEnum};
use muster_core::domain::AgentRole;

#[derive(Debug, Parser)]
#[command(version, about = "Muster CLI", long_about = None, bin_name = "muster")]
pub struct Cli {
  #[command(subcommand)]
  pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
  /// Daemon related commands
  Daemon(DaemonArgs),
  /// Track a repository
  AddRepo(AddRepoArgs),
  /// Stop tracking a repository
  RemoveRepo(RemoveRepoArgs),
  /// List tracked repositories
  Repos,
  /// List agents in a repository
  Agents(AgentsArgs),
  /// Register an agent in a repository
  AddAgent(AddAgentArgs),
  /// Assign a task to an agent
  Assign(AssignArgs),
  /// Nudge an agent (refresh its activity timestamp)
  Nudge(TargetArgs),
  /// Mark an agent's work complete
  Complete(TargetArgs),
  /// Queue a message for an agent
  Send(SendArgs),
  /// List an agent's mailbox
  Messages(TargetArgs),
  /// Acknowledge a message
  Ack(AckArgs),
}

#[derive(Debug, ClapArgs)]
pub struct AddRepoArgs {
  /// Repository name (unique per daemon)
  pub name: String,
  /// Clone URL
  pub url: String,
  /// Terminal-multiplexer session hosting the repo's windows
  #[arg(long)]
  pub session: Option<String>,
}

#[derive(Debug, ClapArgs)]
pub struct RemoveRepoArgs {
  /// Repository name
  pub name: String,
}

#[derive(Debug, ClapArgs)]
pub struct AgentsArgs {
  /// Repository name
  pub repo: String,
}

#[derive(Debug, ClapArgs)]
pub struct AddAgentArgs {
  /// Repository name
  pub repo: String,
  /// Agent name (unique within the repo)
  pub name: String,
  /// Agent role
  #[arg(long, value_enum, default_value = "worker")]
  pub role: RoleArg,
  /// Worktree path for the agent's checkout
  #[arg(long)]
  pub worktree: String,
  /// Multiplexer window the agent runs in
  #[arg(long)]
  pub window: String,
  /// OS process id backing the agent, if already known
  #[arg(long)]
  pub pid: Option<u32>,
  /// Initial task description
  #[arg(long)]
  pub task: Option<String>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum RoleArg {
  #[value(name = "supervisor")]
  Supervisor,
  #[value(name = "worker")]
  Worker,
  #[value(name = "merge-queue")]
  MergeQueue,
  #[value(name = "pr-shepherd")]
  PrShepherd,
  #[value(name = "workspace")]
  Workspace,
  #[value(name = "review")]
  Review,
}

impl RoleArg {
  pub fn to_role(self) -> AgentRole {
    match self {
      RoleArg::Supervisor => AgentRole::Supervisor,
      RoleArg::Worker => AgentRole::Worker,
      RoleArg::MergeQueue => AgentRole::MergeQueue,
      RoleArg::PrShepherd => AgentRole::PrShepherd,
      RoleArg::Workspace => AgentRole::Workspace,
      RoleArg::Review => AgentRole::Review,
    }
  }
}

#[derive(Debug, ClapArgs)]
pub struct AssignArgs {
  /// Repository name
  pub repo: String,
  /// Agent name
  pub agent: String,
  /// Task description
  pub task: String,
}

#[derive(Debug, ClapArgs)]
pub struct TargetArgs {
  /// Repository name
  pub repo: String,
  /// Agent name
  pub agent: String,
}

#[derive(Debug, ClapArgs)]
pub struct SendArgs {
  /// Repository name
  pub repo: String,
  /// Recipient agent name
  pub to: String,
  /// Message body
  pub body: String,
  /// Sender name (an agent, or e.g. "human")
  #[arg(long, default_value = "human")]
  pub from: String,
}

#[derive(Debug, ClapArgs)]
pub struct AckArgs {
  /// Repository name
  pub repo: String,
  /// Agent name
  pub agent: String,
  /// Message id
  pub id: String,
}

#[derive(Debug, ClapArgs)]
pub struct DaemonArgs {
  #[command(subcommand)]
  pub command: DaemonSubcommand,
}

#[derive(Debug, Subcommand)]
pub enum DaemonSubcommand {
  /// Show daemon status
  Status,
  /// Start the daemon
  Start,
  /// Stop the daemon
  Stop,
  /// Run the daemon (foreground)
  Run,
  /// Restart the daemon
  Restart,
}

impl Cli {
  pub fn print_help_and_exit() {
    let mut cmd = Cli::command();
    cmd.print_help().expect("print help");
    println!();
  }
}
