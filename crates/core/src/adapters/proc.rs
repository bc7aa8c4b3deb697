/// Process-liveness collaborator: a non-destructive existence check,
/// never a termination signal.
pub trait ProcessProbe: Send + Sync {
  fn is_alive(&self, pid: u32) -> bool;
}

/// Production probe using signal 0, which performs permission and
/// existence checks without delivering anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct SignalProbe;

impl ProcessProbe for SignalProbe {
  fn is_alive(&self, pid: u32) -> bool {
    let Ok(pid) = i32::try_from(pid) else {
      return false;
    };
    match nix::sys::signal::kill(nix::unistd::Pid::from_raw(pid), None) {
      Ok(()) => true,
      // EPERM means the process exists but belongs to someone else.
      Err(nix::errno::Errno::EPERM) => true,
      Err(_) => false,
    }
  }
}
