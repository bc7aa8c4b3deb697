use muster_core::daemon::Daemon;

use crate::rpc::client;
use crate::util::daemon_proc::{resolve, spawn_daemon_background};

use super::block_on;

pub fn print_status() {
  match resolve() {
    Some(paths) => {
      let res = block_on(async { client::daemon_status(&paths.daemon_sock).await });
      match res {
        Ok(status) => {
          println!(
            "daemon: running (v{}, pid {}, socket {})",
            status.version, status.pid, status.socket_path
          );
        }
        Err(_) => {
          println!("daemon: stopped");
        }
      }
    }
    None => println!("daemon: stopped"),
  }
}

pub fn run_daemon_foreground() {
  let Some(paths) = resolve() else {
    eprintln!("could not resolve a state root; set MUSTER_ROOT");
    std::process::exit(1);
  };
  let rt = tokio::runtime::Builder::new_multi_thread()
    .enable_io()
    .enable_time()
    .worker_threads(2)
    .build()
    .unwrap();
  rt.block_on(async move {
    let daemon = match Daemon::new(paths.clone()) {
      Ok(d) => d,
      Err(e) => {
        eprintln!("failed to build daemon: {e}");
        std::process::exit(1);
      }
    };
    muster_core::logging::init(&paths.daemon_log, daemon.config.log_level);
    let handle = match daemon.start() {
      Ok(h) => h,
      Err(e) => {
        eprintln!("failed to start daemon: {e}");
        std::process::exit(1);
      }
    };
    tokio::select! {
      _ = tokio::signal::ctrl_c() => {
        handle.request_stop();
      }
      _ = handle.stopped() => {}
    }
    handle.wait().await;
  });
}

pub fn start_daemon() {
  let Some(paths) = resolve() else {
    println!("daemon: stopped");
    return;
  };
  let already_running =
    block_on(async { client::daemon_status(&paths.daemon_sock).await.is_ok() });
  if already_running {
    print_status();
    return;
  }

  if spawn_daemon_background(&paths.root).is_err() {
    println!("daemon: stopped");
    return;
  }

  let running = block_on(async {
    for _ in 0..20u8 {
      if client::daemon_status(&paths.daemon_sock).await.is_ok() {
        return true;
      }
      tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    }
    false
  });
  if running {
    print_status();
  } else {
    println!("daemon: stopped");
  }
}

pub fn stop_daemon() {
  let Some(paths) = resolve() else {
    println!("daemon: stopped");
    return;
  };
  let _ = block_on(async {
    let _ = client::daemon_shutdown(&paths.daemon_sock).await;
    for _ in 0..20u8 {
      if client::daemon_status(&paths.daemon_sock).await.is_err() {
        return true;
      }
      tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    }
    false
  });
  println!("daemon: stopped");
}

pub fn restart_daemon() {
  stop_daemon();
  start_daemon();
}
