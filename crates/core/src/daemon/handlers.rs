//! Command handlers for the control socket.
//!
//! Dispatch is by command name over a fixed table. Every handler parses
//! the open args map into a typed params struct up front and answers
//! usage errors with `success=false`; nothing here panics a connection.

use chrono::Utc;
use tokio::sync::watch;
use tracing::info;

use super::Daemon;
use crate::domain::{Agent, Repository};
use crate::events::{Event, EventType};
use crate::protocol::{
  AckMessageParams, AddAgentParams, AddRepoParams, AgentInfo, AgentParams, AssignTaskParams,
  DaemonStatus, ListAgentsParams, RepoInfo, RepoParams, Request, Response, SendMessageParams,
};
use crate::state::StateError;

/// Map a state error onto a failure response, attaching a remediation
/// hint for unknown targets.
fn state_failure(err: StateError) -> Response {
  match &err {
    StateError::UnknownRepo(_) => {
      Response::failure(format!("{err} (run `muster repos` to list tracked repositories)"))
    }
    StateError::UnknownAgent { repo, .. } => {
      Response::failure(format!("{err} (run `muster agents {repo}` to list its agents)"))
    }
    _ => Response::failure(err.to_string()),
  }
}

pub async fn dispatch(daemon: &Daemon, req: &Request, shutdown: &watch::Sender<bool>) -> Response {
  match req.command.as_str() {
    "ping" => ping(daemon),
    "shutdown" => {
      info!(event = "shutdown_requested", "shutdown requested over control socket");
      let _ = shutdown.send(true);
      Response::ok_empty()
    }
    "add_repo" => add_repo(daemon, req),
    "remove_repo" => remove_repo(daemon, req),
    "list_repos" => list_repos(daemon),
    "add_agent" => add_agent(daemon, req),
    "list_agents" => list_agents(daemon, req),
    "assign_task" => assign_task(daemon, req),
    "nudge_agent" => nudge_agent(daemon, req),
    "complete_agent" => complete_agent(daemon, req),
    "send_message" => send_message(daemon, req),
    "list_messages" => list_messages(daemon, req),
    "ack_message" => ack_message(daemon, req),
    other => Response::failure(format!("unknown command '{other}'")),
  }
}

fn ping(daemon: &Daemon) -> Response {
  Response::ok(DaemonStatus {
    version: env!("CARGO_PKG_VERSION").to_string(),
    pid: std::process::id(),
    socket_path: daemon.paths.daemon_sock.display().to_string(),
  })
}

fn add_repo(daemon: &Daemon, req: &Request) -> Response {
  let p: AddRepoParams = match req.parse_args() {
    Ok(p) => p,
    Err(e) => return Response::failure(e),
  };
  match daemon
    .state
    .add_repo(&p.name, Repository::new(&p.url, &p.session))
  {
    Ok(()) => {
      info!(event = "repo_added", repo = %p.name, url = %p.url, "repository registered");
      Response::ok_empty()
    }
    Err(e) => state_failure(e),
  }
}

fn remove_repo(daemon: &Daemon, req: &Request) -> Response {
  let p: RepoParams = match req.parse_args() {
    Ok(p) => p,
    Err(e) => return Response::failure(e),
  };
  match daemon.state.remove_repo(&p.name) {
    Ok(()) => {
      info!(event = "repo_removed", repo = %p.name, "repository removed");
      Response::ok_empty()
    }
    Err(e) => state_failure(e),
  }
}

fn list_repos(daemon: &Daemon) -> Response {
  let repos: Vec<RepoInfo> = daemon
    .state
    .list_repos()
    .into_iter()
    .map(|(name, r)| RepoInfo {
      name,
      url: r.url,
      session: r.mux_session,
      agents: r.agents.keys().cloned().collect(),
    })
    .collect();
  Response::ok(repos)
}

fn add_agent(daemon: &Daemon, req: &Request) -> Response {
  let p: AddAgentParams = match req.parse_args() {
    Ok(p) => p,
    Err(e) => return Response::failure(e),
  };
  let mut agent = Agent::new(p.role, &p.worktree, &p.window);
  agent.pid = p.pid;
  agent.task = p.task.unwrap_or_default();
  match daemon.state.add_agent(&p.repo, &p.name, agent.clone()) {
    Ok(()) => {
      info!(event = "agent_added", repo = %p.repo, agent = %p.name, role = p.role.as_str(), "agent registered");
      daemon.events.emit(
        Event::new(EventType::AgentStarted)
          .repo(&p.repo)
          .agent(&p.name)
          .with("agent_type", p.role.as_str())
          .with("task", agent.task.clone()),
      );
      Response::ok(AgentInfo {
        name: p.name,
        agent,
      })
    }
    Err(e) => state_failure(e),
  }
}

fn list_agents(daemon: &Daemon, req: &Request) -> Response {
  let p: ListAgentsParams = match req.parse_args() {
    Ok(p) => p,
    Err(e) => return Response::failure(e),
  };
  match daemon.state.list_agents(&p.repo) {
    Ok(agents) => Response::ok(
      agents
        .into_iter()
        .map(|(name, agent)| AgentInfo { name, agent })
        .collect::<Vec<_>>(),
    ),
    Err(e) => state_failure(e),
  }
}

fn assign_task(daemon: &Daemon, req: &Request) -> Response {
  let p: AssignTaskParams = match req.parse_args() {
    Ok(p) => p,
    Err(e) => return Response::failure(e),
  };
  match daemon.state.assign_task(&p.repo, &p.agent, &p.task) {
    Ok(agent) => {
      info!(event = "task_assigned", repo = %p.repo, agent = %p.agent, "task assigned");
      daemon.events.emit(
        Event::new(EventType::TaskAssigned)
          .repo(&p.repo)
          .agent(&p.agent)
          .with("task", p.task.clone()),
      );
      Response::ok(AgentInfo {
        name: p.agent,
        agent,
      })
    }
    Err(e) => state_failure(e),
  }
}

fn nudge_agent(daemon: &Daemon, req: &Request) -> Response {
  let p: AgentParams = match req.parse_args() {
    Ok(p) => p,
    Err(e) => return Response::failure(e),
  };
  match daemon
    .state
    .update_agent(&p.repo, &p.agent, |a| a.last_nudge = Some(Utc::now()))
  {
    Ok(agent) => Response::ok(AgentInfo {
      name: p.agent,
      agent,
    }),
    Err(e) => state_failure(e),
  }
}

/// Flags the agent for cleanup. Removal stays with the reconciliation
/// loop so there is exactly one removal code path.
fn complete_agent(daemon: &Daemon, req: &Request) -> Response {
  let p: AgentParams = match req.parse_args() {
    Ok(p) => p,
    Err(e) => return Response::failure(e),
  };
  match daemon
    .state
    .update_agent(&p.repo, &p.agent, |a| a.ready_for_cleanup = true)
  {
    Ok(_) => {
      info!(event = "agent_completed", repo = %p.repo, agent = %p.agent, "agent marked ready for cleanup");
      daemon.events.emit(
        Event::new(EventType::TaskComplete)
          .repo(&p.repo)
          .agent(&p.agent),
      );
      Response::ok_empty()
    }
    Err(e) => state_failure(e),
  }
}

fn send_message(daemon: &Daemon, req: &Request) -> Response {
  let p: SendMessageParams = match req.parse_args() {
    Ok(p) => p,
    Err(e) => return Response::failure(e),
  };
  // The recipient must be a tracked agent; senders may be anything
  // (humans message agents too).
  if daemon.state.get_agent(&p.repo, &p.to).is_none() {
    return state_failure(StateError::UnknownAgent {
      repo: p.repo.clone(),
      agent: p.to.clone(),
    });
  }
  match daemon.messages.send(&p.repo, &p.from, &p.to, &p.body) {
    Ok(msg) => {
      info!(event = "message_queued", repo = %p.repo, from = %p.from, to = %p.to, id = %msg.id, "message queued");
      daemon.events.emit(
        Event::new(EventType::MessageSent)
          .repo(&p.repo)
          .with("from", p.from.clone())
          .with("to", p.to.clone())
          .with("body", p.body.clone()),
      );
      Response::ok(msg)
    }
    Err(e) => Response::failure(e.to_string()),
  }
}

fn list_messages(daemon: &Daemon, req: &Request) -> Response {
  let p: AgentParams = match req.parse_args() {
    Ok(p) => p,
    Err(e) => return Response::failure(e),
  };
  match daemon.messages.list(&p.repo, &p.agent) {
    Ok(msgs) => Response::ok(msgs),
    Err(e) => Response::failure(e.to_string()),
  }
}

fn ack_message(daemon: &Daemon, req: &Request) -> Response {
  let p: AckMessageParams = match req.parse_args() {
    Ok(p) => p,
    Err(e) => return Response::failure(e),
  };
  match daemon.messages.mark_acknowledged(&p.repo, &p.agent, &p.id) {
    Ok(msg) => Response::ok(msg),
    Err(e) => Response::failure(e.to_string()),
  }
}
