pub mod args;
pub mod commands;
pub mod rpc;
pub mod util;

use clap::Parser;

pub fn run() {
  // If no additional args, show help and exit 0
  if std::env::args_os().len() == 1 {
    args::Cli::print_help_and_exit();
    return;
  }

  let cli = args::Cli::parse();
  match cli.command {
    Some(args::Commands::Daemon(daemon)) => match daemon.command {
      args::DaemonSubcommand::Status => commands::daemon::print_status(),
      args::DaemonSubcommand::Start => commands::daemon::start_daemon(),
      args::DaemonSubcommand::Stop => commands::daemon::stop_daemon(),
      args::DaemonSubcommand::Run => commands::daemon::run_daemon_foreground(),
      args::DaemonSubcommand::Restart => commands::daemon::restart_daemon(),
    },
    Some(args::Commands::AddRepo(a)) => commands::repos::add(a),
    Some(args::Commands::RemoveRepo(a)) => commands::repos::remove(a),
    Some(args::Commands::Repos) => commands::repos::list(),
    Some(args::Commands::Agents(a)) => commands::agents::list(a),
    Some(args::Commands::AddAgent(a)) => commands::agents::add(a),
    Some(args::Commands::Assign(a)) => commands::agents::assign(a),
    Some(args::Commands::Nudge(a)) => commands::agents::nudge(a),
    Some(args::Commands::Complete(a)) => commands::agents::complete(a),
    Some(args::Commands::Send(a)) => commands::messages::send(a),
    Some(args::Commands::Messages(a)) => commands::messages::list(a),
    Some(args::Commands::Ack(a)) => commands::messages::ack(a),
    None => {
      args::Cli::print_help_and_exit();
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use clap::{CommandFactory, Parser, error::ErrorKind};

  #[test]
  fn help_flag_triggers_displayhelp() {
    let err = args::Cli::try_parse_from(["muster", "--help"]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DisplayHelp);
  }

  #[test]
  fn version_flag_triggers_displayversion() {
    let err = args::Cli::try_parse_from(["muster", "--version"]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DisplayVersion);
  }

  #[test]
  fn command_factory_builds() {
    let _ = args::Cli::command();
  }

  #[test]
  fn add_agent_parses_role_and_flags() {
    let cli = args::Cli::try_parse_from([
      "muster",
      "add-agent",
      "demo",
      "mq",
      "--role",
      "merge-queue",
      "--worktree",
      "/tmp/mq",
      "--window",
      "demo:2",
      "--pid",
      "4242",
    ])
    .unwrap();
    match cli.command {
      Some(args::Commands::AddAgent(a)) => {
        assert_eq!(a.repo, "demo");
        assert_eq!(a.name, "mq");
        assert_eq!(a.role.to_role(), muster_core::domain::AgentRole::MergeQueue);
        assert_eq!(a.pid, Some(4242));
        assert_eq!(a.task, None);
      }
      other => panic!("unexpected command: {other:?}"),
    }
  }

  #[test]
  fn send_defaults_sender_to_human() {
    let cli =
      args::Cli::try_parse_from(["muster", "send", "demo", "w1", "please rebase"]).unwrap();
    match cli.command {
      Some(args::Commands::Send(a)) => {
        assert_eq!(a.from, "human");
        assert_eq!(a.to, "w1");
        assert_eq!(a.body, "please rebase");
      }
      other => panic!("unexpected command: {other:?}"),
    }
  }

  #[test]
  fn add_agent_rejects_unknown_role() {
    let err = args::Cli::try_parse_from([
      "muster",
      "add-agent",
      "demo",
      "x",
      "--role",
      "overlord",
      "--worktree",
      "/tmp/x",
      "--window",
      "demo:1",
    ])
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidValue);
  }
}
