use muster_core::messages::{Message, MessageStatus};
use muster_core::protocol::Request;
use yansi::Paint;

use crate::args::{AckArgs, SendArgs, TargetArgs};
use crate::util::daemon_proc::ensure_daemon_running;

use super::call_typed_or_exit;

pub fn send(args: SendArgs) {
  let paths = ensure_daemon_running();
  let req = Request::new("send_message")
    .arg("repo", args.repo.as_str())
    .arg("from", args.from.as_str())
    .arg("to", args.to.as_str())
    .arg("body", args.body.as_str());
  let msg: Message = call_typed_or_exit(&paths, "send", &req);
  println!("queued {} for {}", msg.id, msg.to);
}

pub fn list(args: TargetArgs) {
  let paths = ensure_daemon_running();
  let req = Request::new("list_messages")
    .arg("repo", args.repo.as_str())
    .arg("agent", args.agent.as_str());
  let msgs: Vec<Message> = call_typed_or_exit(&paths, "messages", &req);
  if msgs.is_empty() {
    println!("no messages for {}", args.agent);
    return;
  }
  for m in msgs {
    let status = match m.status {
      MessageStatus::Pending => "pending".yellow().to_string(),
      MessageStatus::Delivered => "delivered".green().to_string(),
      MessageStatus::Acknowledged => "acknowledged".dim().to_string(),
    };
    println!("{}  [{}] {}  {}", status, m.from, m.body, m.id.dim());
  }
}

pub fn ack(args: AckArgs) {
  let paths = ensure_daemon_running();
  let req = Request::new("ack_message")
    .arg("repo", args.repo.as_str())
    .arg("agent", args.agent.as_str())
    .arg("id", args.id.as_str());
  let msg: Message = call_typed_or_exit(&paths, "ack", &req);
  println!("acknowledged {}", msg.id);
}
