use std::sync::mpsc;
use std::thread;

use recoil_link::{Capture, ReplayProvider};
use recoil_session::{ConnectionSupervisor, SessionConfig, SessionHandle, SupervisorExit};
use tracing::{debug, info};

use crate::cmd::{parse_duration, ReplayArgs};
use crate::exit::{link_error, session_error, CliError, CliResult, FAILURE, INTERNAL, SUCCESS};
use crate::output::{print_event, OutputFormat};

pub fn run(args: ReplayArgs, format: OutputFormat) -> CliResult<i32> {
    let config = load_config(&args)?;
    let capture =
        Capture::from_file(&args.capture).map_err(|err| link_error("capture load failed", err))?;
    info!(
        capture = %args.capture.display(),
        steps = capture.steps.len(),
        device = %capture.name,
        "replaying capture"
    );

    let provider = ReplayProvider::new(capture).with_rescan(args.repeat);
    let (tx, rx) = mpsc::channel();
    let mut supervisor = ConnectionSupervisor::new(provider, tx, config)
        .map_err(|err| session_error("invalid configuration", err))?;

    install_ctrlc_handler(supervisor.handle())?;

    let worker = thread::Builder::new()
        .name("recoil-session".to_string())
        .spawn(move || supervisor.run())
        .map_err(|err| CliError::new(INTERNAL, format!("session thread failed: {err}")))?;

    // The channel closes when the supervisor returns and drops its sender.
    for event in rx {
        print_event(&event, format);
    }

    let exit = worker
        .join()
        .map_err(|_| CliError::new(INTERNAL, "session thread panicked"))?;
    debug!(?exit, "supervisor finished");

    match exit {
        SupervisorExit::Stopped | SupervisorExit::Disconnected(_) => Ok(SUCCESS),
        SupervisorExit::ConnectFailed(reason) => {
            Err(CliError::new(FAILURE, format!("connect failed: {reason}")))
        }
    }
}

fn load_config(args: &ReplayArgs) -> CliResult<SessionConfig> {
    let mut config = match &args.config {
        Some(path) => {
            SessionConfig::load(path).map_err(|err| session_error("config load failed", err))?
        }
        None => SessionConfig::default(),
    };

    // A capture is finite; only keep going when asked to loop.
    config.reconnect = args.repeat;

    if let Some(value) = &args.reload_interval {
        config.reload_interval_ms = millis(parse_duration(value)?);
    }
    if let Some(value) = &args.receive_timeout {
        config.receive_timeout_ms = millis(parse_duration(value)?);
    }
    config
        .validate()
        .map_err(|err| session_error("invalid configuration", err))?;
    Ok(config)
}

fn millis(duration: std::time::Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

fn install_ctrlc_handler(handle: SessionHandle) -> CliResult<()> {
    ctrlc::set_handler(move || {
        handle.stop();
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn args() -> ReplayArgs {
        ReplayArgs {
            capture: PathBuf::from("capture.txt"),
            config: None,
            reload_interval: None,
            receive_timeout: None,
            repeat: false,
        }
    }

    #[test]
    fn overrides_apply_on_top_of_defaults() {
        let mut args = args();
        args.reload_interval = Some("500ms".to_string());
        args.receive_timeout = Some("2s".to_string());

        let config = load_config(&args).unwrap();
        assert_eq!(config.reload_interval_ms, 500);
        assert_eq!(config.receive_timeout_ms, 2000);
        assert!(!config.reconnect);
        assert_eq!(config.max_ammo, 30);
    }

    #[test]
    fn loop_enables_reconnect() {
        let mut args = args();
        args.repeat = true;
        assert!(load_config(&args).unwrap().reconnect);
    }
}
