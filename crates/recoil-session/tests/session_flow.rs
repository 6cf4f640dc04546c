use std::sync::mpsc;
use std::time::Duration;

use recoil_frame::{encode_command, Command, TaggerType, FRAME_LEN};
use recoil_link::{Capture, Characteristic, ReplayLink, ReplayProvider, WriteLog};
use recoil_session::{
    session_channel, ConnectionSupervisor, SessionConfig, SessionEnd, SessionEvent,
    SupervisorExit, TaggerSession, UserAction,
};

fn telemetry(set: &[(usize, u8)]) -> Vec<u8> {
    let mut data = vec![0u8; FRAME_LEN];
    for &(idx, value) in set {
        data[idx] = value;
    }
    data
}

fn config() -> SessionConfig {
    SessionConfig {
        receive_timeout_ms: 5,
        scan_duration_ms: 5,
        reconnect_delay_ms: 5,
        reload_interval_ms: 40,
        ..SessionConfig::default()
    }
}

fn run_capture(
    capture: Capture,
    config: &SessionConfig,
) -> (SessionEnd, Vec<SessionEvent>, WriteLog) {
    let writes = WriteLog::new();
    let link = ReplayLink::new(capture, writes.clone());
    let (handle, inbox) = session_channel();
    let mut events = Vec::new();
    let end = {
        let mut session = TaggerSession::establish(link, &mut events, config, handle)
            .expect("session should establish");
        session.run(&inbox)
    };
    (end, events, writes)
}

fn without_messages(events: &[SessionEvent]) -> Vec<SessionEvent> {
    events
        .iter()
        .filter(|event| !matches!(event, SessionEvent::Message { .. }))
        .cloned()
        .collect()
}

#[test]
fn first_frame_publishes_ammo_and_nothing_else() {
    let capture = Capture::new().notify(telemetry(&[(1, 5), (3, 0x10), (14, 0x1E)]));
    let (end, events, writes) = run_capture(capture, &config());

    assert_eq!(
        end,
        SessionEnd::LinkLost("link disconnected: end of capture".to_string())
    );
    let events = without_messages(&events);
    assert!(matches!(events[0], SessionEvent::Connected { .. }));
    assert_eq!(events[1], SessionEvent::AmmoChanged { count: 30 });
    assert!(matches!(events[2], SessionEvent::Disconnected { .. }));
    assert_eq!(events.len(), 3);
    assert!(writes.is_empty());
}

#[test]
fn fire_edge_without_reload_edge() {
    let capture = Capture::new()
        .notify(telemetry(&[(3, 0x10), (14, 10)]))
        .notify(telemetry(&[(3, 0x13), (14, 10)]));
    let (_end, events, writes) = run_capture(capture, &config());

    let events = without_messages(&events);
    assert_eq!(events[2], SessionEvent::FirePressed { ammo_empty: false });
    assert!(!events.contains(&SessionEvent::ReloadStarted));
    assert!(writes.to(Characteristic::Command).is_empty());
}

#[test]
fn reload_runs_to_completion_across_idle_polls() {
    let capture = Capture::new()
        .notify(telemetry(&[(3, 0x00), (14, 3)]))
        .notify(telemetry(&[(3, 0x10), (14, 3)]))
        .idle(40)
        .notify(telemetry(&[(3, 0x10), (14, 30)]));
    let (_end, events, writes) = run_capture(capture, &config());

    let commands = writes.to(Characteristic::Command);
    assert_eq!(commands.len(), 2);
    assert_eq!(
        commands[0].as_ref(),
        &encode_command(&Command::StartReload, TaggerType::Pistol)[..]
    );
    assert_eq!(
        commands[1].as_ref(),
        &encode_command(&Command::FinishReload { ammo: 30 }, TaggerType::Pistol)[..]
    );

    let events = without_messages(&events);
    let started = events
        .iter()
        .position(|e| *e == SessionEvent::ReloadStarted)
        .expect("reload should start");
    let finished = events
        .iter()
        .position(|e| *e == SessionEvent::ReloadFinished { ammo: 30 })
        .expect("reload should finish");
    assert!(started < finished);
}

#[test]
fn link_loss_during_reload_never_finishes() {
    let capture = Capture::new()
        .notify(telemetry(&[]))
        .notify(telemetry(&[(3, 0x10)]))
        .disconnect("battery removed");
    let (end, events, writes) = run_capture(capture, &config());

    assert_eq!(
        end,
        SessionEnd::LinkLost("link disconnected: battery removed".to_string())
    );
    std::thread::sleep(Duration::from_millis(100));
    assert_eq!(writes.to(Characteristic::Command).len(), 1);
    assert!(!events
        .iter()
        .any(|e| matches!(e, SessionEvent::ReloadFinished { .. })));
    assert_eq!(
        events.last(),
        Some(&SessionEvent::Disconnected {
            reason: "link disconnected: battery removed".to_string()
        })
    );
}

#[test]
fn teardown_cancels_pending_reload_timer() {
    let capture = Capture::new()
        .notify(telemetry(&[]))
        .notify(telemetry(&[(3, 0x10)]))
        .disconnect("battery removed");
    let link = ReplayLink::new(capture, WriteLog::new());
    let (handle, inbox) = session_channel();
    let cfg = config();
    let mut events = Vec::new();
    let mut session =
        TaggerSession::establish(link, &mut events, &cfg, handle).expect("session should establish");

    assert!(matches!(session.run(&inbox), SessionEnd::LinkLost(_)));
    std::thread::sleep(cfg.reload_interval() * 3);

    // The session is still alive, so an uncancelled timer would have posted here.
    let stale: Vec<_> = inbox.try_iter().collect();
    assert!(stale.is_empty(), "messages after teardown = {stale:?}");
    drop(session);

    assert!(events.contains(&SessionEvent::ReloadStarted));
}

#[test]
fn malformed_frames_do_not_end_the_session() {
    let capture = Capture::new()
        .notify(vec![0u8; 5])
        .notify(telemetry(&[(14, 7)]))
        .notify(vec![0u8; 21]);
    let (_end, events, _writes) = run_capture(capture, &config());

    assert!(events.contains(&SessionEvent::AmmoChanged { count: 7 }));
}

#[test]
fn rejected_config_write_reports_and_keeps_state() {
    let capture = Capture::new()
        .reject_writes(Characteristic::Config)
        .notify(telemetry(&[]))
        .notify(telemetry(&[(5, 0x01)]));
    let (_end, events, writes) = run_capture(capture, &config());

    assert!(!events
        .iter()
        .any(|e| matches!(e, SessionEvent::RecoilToggled { .. })));
    assert!(events.iter().any(|e| matches!(
        e,
        SessionEvent::Message { text } if text.starts_with("Failed to set recoil")
    )));
    assert!(writes.is_empty());
}

#[test]
fn user_actions_reach_the_running_session() {
    let writes = WriteLog::new();
    let link = ReplayLink::new(Capture::new().idle(1000), writes.clone());
    let (handle, inbox) = session_channel();
    let (tx, rx) = mpsc::channel();
    let cfg = config();

    let control = handle.clone();
    let worker = std::thread::spawn(move || {
        let mut session =
            TaggerSession::establish(link, tx, &cfg, handle).expect("session should establish");
        session.run(&inbox)
    });

    assert!(control.send(UserAction::CycleFireMode));
    loop {
        let event = rx
            .recv_timeout(Duration::from_secs(2))
            .expect("session should publish");
        if let SessionEvent::FireModeChanged { mode, .. } = event {
            assert_eq!(mode, recoil_frame::FireMode::Burst);
            break;
        }
    }
    control.stop();

    assert_eq!(worker.join().unwrap(), SessionEnd::Stopped);
    assert_eq!(writes.to(Characteristic::Config).len(), 1);
    assert!(rx.try_iter().any(|e| matches!(
        e,
        SessionEvent::Disconnected { reason } if reason == "stopped"
    )));
}

#[test]
fn supervisor_runs_a_capture_end_to_end() {
    let capture = Capture::new()
        .with_identity({
            let mut id = vec![0u8; FRAME_LEN];
            id[10] = 1;
            id
        })
        .notify(telemetry(&[(14, 30)]))
        .notify(telemetry(&[(4, 0x01), (14, 30)]));
    let provider = ReplayProvider::new(capture);
    let writes = provider.writes();
    let cfg = SessionConfig {
        reconnect: false,
        ..config()
    };
    let mut events = Vec::new();
    let exit = ConnectionSupervisor::new(provider, &mut events, cfg)
        .unwrap()
        .run();

    assert!(matches!(exit, SupervisorExit::Disconnected(_)));
    let fire_config = writes.to(Characteristic::Config);
    assert_eq!(fire_config.len(), 1);
    // Burst on a rifle.
    assert_eq!(fire_config[0][9], 0x78);
    assert!(events.contains(&SessionEvent::message("Burst")));
}
