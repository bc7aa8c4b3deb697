use muster_core::protocol::{RepoInfo, Request};
use yansi::Paint;

use crate::args::{AddRepoArgs, RemoveRepoArgs};
use crate::util::daemon_proc::ensure_daemon_running;

use super::{call_or_exit, call_typed_or_exit};

pub fn add(args: AddRepoArgs) {
  let paths = ensure_daemon_running();
  // Default the multiplexer session to the repo name.
  let session = args.session.unwrap_or_else(|| args.name.clone());
  let req = Request::new("add_repo")
    .arg("name", args.name.as_str())
    .arg("url", args.url.as_str())
    .arg("session", session.as_str());
  call_or_exit(&paths, "add-repo", &req);
  println!("repo {} tracked", args.name);
}

pub fn remove(args: RemoveRepoArgs) {
  let paths = ensure_daemon_running();
  let req = Request::new("remove_repo").arg("name", args.name.as_str());
  call_or_exit(&paths, "remove-repo", &req);
  println!("repo {} removed", args.name);
}

pub fn list() {
  let paths = ensure_daemon_running();
  let repos: Vec<RepoInfo> = call_typed_or_exit(&paths, "repos", &Request::new("list_repos"));
  if repos.is_empty() {
    println!("no repositories tracked");
    return;
  }
  for r in repos {
    println!(
      "{}  {}  {}",
      r.name.bold(),
      r.url,
      format!("(session {}, {} agents)", r.session, r.agents.len()).dim()
    );
  }
}
