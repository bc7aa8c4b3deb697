use muster_core::protocol::{AgentInfo, Request};
use yansi::Paint;

use crate::args::{AddAgentArgs, AgentsArgs, AssignArgs, TargetArgs};
use crate::util::daemon_proc::ensure_daemon_running;

use super::{call_or_exit, call_typed_or_exit};

pub fn add(args: AddAgentArgs) {
  let paths = ensure_daemon_running();
  let role = args.role.to_role();
  let mut req = Request::new("add_agent")
    .arg("repo", args.repo.as_str())
    .arg("name", args.name.as_str())
    .arg("role", role.as_str())
    .arg("worktree", args.worktree.as_str())
    .arg("window", args.window.as_str());
  if let Some(pid) = args.pid {
    req = req.arg("pid", pid);
  }
  if let Some(task) = &args.task {
    req = req.arg("task", task.as_str());
  }
  let info: AgentInfo = call_typed_or_exit(&paths, "add-agent", &req);
  println!(
    "agent {} ({}) registered in {}",
    info.name,
    info.agent.role.as_str(),
    args.repo
  );
}

pub fn list(args: AgentsArgs) {
  let paths = ensure_daemon_running();
  let req = Request::new("list_agents").arg("repo", args.repo.as_str());
  let agents: Vec<AgentInfo> = call_typed_or_exit(&paths, "agents", &req);
  if agents.is_empty() {
    println!("no agents in {}", args.repo);
    return;
  }
  for a in agents {
    let task = if a.agent.is_idle() {
      "idle".to_string()
    } else {
      a.agent.task.clone()
    };
    let mut extras = vec![format!("window {}", a.agent.mux_window)];
    if let Some(pid) = a.agent.pid {
      extras.push(format!("pid {pid}"));
    }
    if a.agent.ready_for_cleanup {
      extras.push("ready for cleanup".to_string());
    }
    println!(
      "{}  {}  {}  {}",
      a.name.bold(),
      a.agent.role.as_str(),
      task,
      format!("({})", extras.join(", ")).dim()
    );
  }
}

pub fn assign(args: AssignArgs) {
  let paths = ensure_daemon_running();
  let req = Request::new("assign_task")
    .arg("repo", args.repo.as_str())
    .arg("agent", args.agent.as_str())
    .arg("task", args.task.as_str());
  let info: AgentInfo = call_typed_or_exit(&paths, "assign", &req);
  println!("task assigned to {}: {}", info.name, info.agent.task);
}

pub fn nudge(args: TargetArgs) {
  let paths = ensure_daemon_running();
  let req = Request::new("nudge_agent")
    .arg("repo", args.repo.as_str())
    .arg("agent", args.agent.as_str());
  let info: AgentInfo = call_typed_or_exit(&paths, "nudge", &req);
  println!("nudged {}", info.name);
}

pub fn complete(args: TargetArgs) {
  let paths = ensure_daemon_running();
  let req = Request::new("complete_agent")
    .arg("repo", args.repo.as_str())
    .arg("agent", args.agent.as_str());
  call_or_exit(&paths, "complete", &req);
  println!("{} marked ready for cleanup", args.agent);
}
