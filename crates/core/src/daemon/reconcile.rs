//! The reconciliation loop: per tick, drain pending mailbox entries
//! into terminal windows and reap agents whose backing process is
//! gone. Every step is best effort; a failure for one agent never
//! aborts the rest of the tick, and transient collaborator failures
//! self-heal on the next pass.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::Daemon;
use crate::events::{Event, EventType};
use crate::messages::MessageStatus;

pub fn spawn(daemon: Arc<Daemon>, mut shutdown_rx: watch::Receiver<bool>) -> JoinHandle<()> {
  let interval = Duration::from_secs(daemon.config.reconcile_interval_secs.max(1));
  tokio::spawn(async move {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick of tokio's interval fires immediately; that is
    // fine, it just reconciles the freshly loaded state.
    loop {
      tokio::select! {
        _ = shutdown_rx.changed() => {
          info!(event = "reconciler_shutdown", "reconciliation loop stopping");
          break;
        }
        _ = ticker.tick() => {
          tick(&daemon).await;
        }
      }
    }
  })
}

/// One reconciliation pass over every tracked repository.
pub async fn tick(daemon: &Daemon) {
  route_messages(daemon).await;
  sweep_dead_agents(daemon);
}

/// Forward pending messages into their recipients' terminal windows.
/// A message only transitions to delivered once an attempt actually
/// succeeds; failed attempts are logged and retried next tick. Within
/// one mailbox, delivery stops at the first failure to preserve order.
async fn route_messages(daemon: &Daemon) {
  for (repo_name, repo) in daemon.state.list_repos() {
    for (agent_name, agent) in &repo.agents {
      let msgs = match daemon.messages.list(&repo_name, agent_name) {
        Ok(m) => m,
        Err(e) => {
          warn!(event = "mailbox_read_failed", repo = %repo_name, agent = %agent_name, error = %e, "skipping mailbox this tick");
          continue;
        }
      };
      for msg in msgs.iter().filter(|m| m.status == MessageStatus::Pending) {
        let text = format!("[{}] {}", msg.from, msg.body);
        match daemon
          .mux
          .send_text(&repo.mux_session, &agent.mux_window, &text)
          .await
        {
          Ok(()) => {
            debug!(event = "message_delivered", repo = %repo_name, agent = %agent_name, id = %msg.id, "message delivered");
            if let Err(e) = daemon.messages.mark_delivered(&repo_name, agent_name, &msg.id) {
              warn!(event = "message_mark_failed", repo = %repo_name, agent = %agent_name, id = %msg.id, error = %e, "could not record delivery");
            }
          }
          Err(e) => {
            warn!(event = "message_delivery_failed", repo = %repo_name, agent = %agent_name, id = %msg.id, error = %e, "will retry next tick");
            break;
          }
        }
      }
    }
  }
}

/// Remove agents whose process has vanished, plus completed agents
/// with no process to wait for. An agent that never recorded a pid is
/// only reaped once it is flagged ready for cleanup.
fn sweep_dead_agents(daemon: &Daemon) {
  for (repo_name, repo) in daemon.state.list_repos() {
    for (agent_name, agent) in &repo.agents {
      let (dead, reason) = match agent.pid {
        Some(pid) if !daemon.probe.is_alive(pid) => (true, "process exited"),
        None if agent.ready_for_cleanup => (true, "cleanup confirmed"),
        _ => (false, ""),
      };
      if !dead {
        continue;
      }
      match daemon.state.remove_agent(&repo_name, agent_name) {
        Ok(()) => {
          info!(event = "agent_reaped", repo = %repo_name, agent = %agent_name, reason, "agent removed");
          daemon.events.emit(
            Event::new(EventType::AgentStopped)
              .repo(&repo_name)
              .agent(agent_name)
              .with("reason", reason),
          );
        }
        Err(e) => {
          // Persist failure: leave the record for the next tick.
          warn!(event = "agent_reap_failed", repo = %repo_name, agent = %agent_name, error = %e, "will retry next tick");
        }
      }
    }
  }
}
