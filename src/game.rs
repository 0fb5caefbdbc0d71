use std::process::Child;
use std::time::Instant;

use crate::config::RunConfig;
use crate::experience::{DamageReward, ExperienceRecorder};
use crate::infra::{BridgeError, Button, ControllerSink, DeltaTransport, PadCommand, RunObserver, RunToken};
use crate::menu::{CursorNavigator, MacroPlayer, MenuNavigator, SETTINGS_TARGET, endless_netplay};
use crate::planners::{ActionId, Agent, ControllerAction, DecisionAgent, NEUTRAL};
use crate::state::{Drained, GameState, LocationRegistry, Menu, StateManager};
use crate::stats::{FrameAdvance, FrameClock, RunStats, StatsReport};

/// One agent-driven controller port.
struct Seat {
    port: usize,
    agent: Agent,
    pad: Box<dyn ControllerSink>,
    navigator: CursorNavigator,
    prev_action: ActionId,
    action: ActionId,
}

/// Frame-stepping driver: sync state, detect new frames, then navigate menus,
/// dispatch agents or skip the results screen depending on the menu value.
pub struct ControlLoop<T: DeltaTransport> {
    transport: T,
    manager: StateManager,
    state: GameState,
    seats: Vec<Seat>,
    settings: CursorNavigator,
    movie: MacroPlayer,
    navigation_complete: bool,
    /// The frame counter has been delivered at least once
    frame_seen: bool,
    recorder: Option<ExperienceRecorder>,
    observer: Box<dyn RunObserver>,
    clock: FrameClock,
    stats: RunStats,
    act_every: u32,
    stats_every: u64,
    action_counter: u64,
    match_frames: u64,
    toggle: bool,
}

impl<T: DeltaTransport> ControlLoop<T> {
    /// `pads` holds one sink per entry of [`RunConfig::ports`], in the same order.
    pub fn new(
        config: &RunConfig,
        registry: LocationRegistry,
        transport: T,
        pads: Vec<Box<dyn ControllerSink>>,
        observer: impl RunObserver + 'static,
    ) -> Result<Self, BridgeError> {
        config.validate()?;

        let ports = config.ports();
        if pads.len() != ports.len() {
            return Err(BridgeError::invalid_config(
                "pads",
                format!("{} pad(s) for {} participant(s)", pads.len(), ports.len()),
            ));
        }

        let seed = config.agent_seed();
        let seats: Vec<Seat> = ports
            .iter()
            .zip(config.characters())
            .zip(pads)
            .map(|((&port, character), pad)| Seat {
                port,
                agent: Agent::new(config.agent, seed.map(|seed| seed.wrapping_add(port as u64))),
                pad,
                navigator: CursorNavigator::new(port, character.cursor_target()),
                prev_action: NEUTRAL,
                action: NEUTRAL,
            })
            .collect();
        for seat in &seats {
            tracing::info!("Port {} driven by {} agent", seat.port, seat.agent.name());
        }

        let recorder = match config.recorder_config() {
            Some(recorder_config) => {
                let port = seats.last().map_or(1, |seat| seat.port);
                let opponent = if port == 0 { 1 } else { 0 };
                Some(ExperienceRecorder::new(
                    recorder_config,
                    Box::new(DamageReward::new(port, opponent)),
                )?)
            }
            None => None,
        };

        Ok(Self {
            transport,
            manager: StateManager::new(registry),
            state: GameState::new(),
            settings: CursorNavigator::new(ports[0], SETTINGS_TARGET),
            movie: MacroPlayer::new(endless_netplay(config.stage)),
            navigation_complete: false,
            frame_seen: false,
            seats,
            recorder,
            observer: Box::new(observer),
            clock: FrameClock::new(),
            stats: RunStats::new(),
            act_every: config.act_every,
            stats_every: config.stats_every(),
            action_counter: 0,
            match_frames: 0,
            toggle: false,
        })
    }

    /// Replace the recorder built from the configuration.
    pub fn with_recorder(mut self, recorder: ExperienceRecorder) -> Self {
        self.recorder = Some(recorder);
        self
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    pub fn recorder(&self) -> Option<&ExperienceRecorder> {
        self.recorder.as_ref()
    }

    /// Poll once, then act on whatever changed.
    pub async fn advance_frame(&mut self) -> Result<(), BridgeError> {
        let drained = self.manager.drain(&mut self.transport, &mut self.state).await?;
        self.step(drained)
    }

    fn step(&mut self, drained: Drained) -> Result<(), BridgeError> {
        self.frame_seen |= drained.frame_updated;
        if !self.frame_seen {
            // Until the counter arrives the snapshot is partly default values
            return Ok(());
        }

        let advance = self.clock.observe(self.state.frame);
        self.stats.record_frame(advance);

        match advance {
            FrameAdvance::Advanced { frame, skipped, .. } if skipped > 0 => {
                self.observer.on_frames_skipped(frame, skipped);
            }
            FrameAdvance::Regressed { from, to } => self.observer.on_frame_regressed(from, to),
            _ => {}
        }

        if !advance.is_new_frame() {
            return Ok(());
        }
        self.make_action()
    }

    fn make_action(&mut self) -> Result<(), BridgeError> {
        match Menu::try_from(self.state.menu) {
            Ok(Menu::Game) => self.play_match()?,
            Ok(menu) if menu.is_pre_match() => self.navigate_menus(),
            Ok(Menu::PostGame) => self.skip_results(),
            _ => self.observer.on_unrecognized_menu(self.state.menu),
        }
        Ok(())
    }

    fn play_match(&mut self) -> Result<(), BridgeError> {
        self.match_frames += 1;
        self.action_counter += 1;

        if self.action_counter % u64::from(self.act_every) == 0 {
            self.dispatch()?;
        }

        if self.match_frames % self.stats_every == 0 {
            let report = self.stats.report(self.act_every);
            self.observer.on_stats(&report);
        }
        Ok(())
    }

    #[tracing::instrument(level = "trace", skip(self), fields(frame = self.state.frame))]
    fn dispatch(&mut self) -> Result<(), BridgeError> {
        let start = Instant::now();
        for seat in &mut self.seats {
            seat.prev_action = seat.action;
            seat.action = seat.agent.act(&self.state);

            let previous = ControllerAction::from_id(seat.prev_action);
            let next = ControllerAction::from_id(seat.action);
            seat.pad.send_all(&next.commands(&previous));
        }
        self.stats.record_thinking(start.elapsed());

        let actions: Vec<ActionId> = self.seats.iter().map(|seat| seat.action).collect();
        self.observer.on_dispatch(self.state.frame, &actions);

        if let (Some(recorder), Some(primary)) = (self.recorder.as_mut(), self.seats.last())
            && let Some(report) = recorder.capture(&self.state, primary.prev_action, primary.action)?
        {
            self.observer.on_flush(&report);
        }
        Ok(())
    }

    fn navigate_menus(&mut self) {
        // Decided before moving, so the settings step starts one frame after the last confirm
        let done = self.seats.iter().all(|seat| seat.navigator.reached());

        for seat in &mut self.seats {
            let commands = seat.navigator.advance(&self.state);
            seat.pad.send_all(&commands);
        }

        if !done {
            return;
        }
        let Some(first) = self.seats.first_mut() else {
            return;
        };

        if self.settings.reached() {
            if !self.navigation_complete {
                self.navigation_complete = true;
                self.observer.on_navigation_complete();
            }
            self.movie.play(first.pad.as_mut());
        } else {
            let commands = self.settings.advance(&self.state);
            first.pad.send_all(&commands);
        }
    }

    /// Alternate release/press of START, once per new frame.
    fn skip_results(&mut self) {
        let command = if self.toggle {
            PadCommand::Press(Button::Start)
        } else {
            PadCommand::Release(Button::Start)
        };
        self.toggle = !self.toggle;

        if let Some(seat) = self.seats.first_mut() {
            seat.pad.send(command);
        }
    }

    /// Re-arm menu navigation and the settings macro for another run.
    pub fn reset_navigation(&mut self) {
        for seat in &mut self.seats {
            seat.navigator.reset();
        }
        self.settings.reset();
        self.movie.reset();
        self.navigation_complete = false;
        self.toggle = false;
    }

    /// Run until `token` is cancelled or a fatal error occurs.
    ///
    /// Final statistics are reported and `child` is terminated on every exit path.
    pub async fn run(
        &mut self,
        mut token: RunToken,
        mut child: Option<Child>,
    ) -> Result<StatsReport, BridgeError> {
        self.observer
            .on_run_start(self.manager.registry().len(), self.seats.len());

        let result = self.run_until_cancelled(&mut token).await;

        let report = self.stats.report(self.act_every);
        self.observer.on_run_finished(&report);

        if let Some(child) = child.as_mut() {
            terminate(child);
        }

        result.map(|_| report)
    }

    async fn run_until_cancelled(&mut self, token: &mut RunToken) -> Result<(), BridgeError> {
        while !token.is_cancelled() {
            let drained = tokio::select! {
                _ = token.cancelled() => break,
                result = self.manager.drain(&mut self.transport, &mut self.state) => result?,
            };
            self.step(drained)?;
        }
        Ok(())
    }
}

fn terminate(child: &mut Child) {
    tracing::info!("Stopping Dolphin (pid {})", child.id());
    if let Err(e) = child.kill() {
        tracing::warn!("Failed to stop Dolphin: {}", e);
        return;
    }
    if let Err(e) = child.wait() {
        tracing::warn!("Failed to reap Dolphin: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::experience::{FlushReport, RecorderConfig};
    use crate::infra::{ChannelTransport, Delta, RecordingPad, run_token};
    use crate::menu::Character;
    use crate::planners::AgentKind;
    use crate::state::TRACKED_PORTS;
    use std::path::Path;
    use std::sync::{Arc, Mutex};
    use tokio::sync::mpsc::UnboundedSender;

    const GAME: u32 = Menu::Game as u32;

    #[derive(Default)]
    struct Events {
        started: usize,
        finished: usize,
        skipped: Vec<(u32, u32)>,
        regressed: Vec<(u32, u32)>,
        unrecognized: Vec<i32>,
        dispatch_frames: Vec<u32>,
        flushes: Vec<FlushReport>,
        navigation_complete: usize,
        stats: usize,
    }

    struct CountingObserver(Arc<Mutex<Events>>);

    impl RunObserver for CountingObserver {
        fn on_run_start(&mut self, _locations: usize, _participants: usize) {
            self.0.lock().unwrap().started += 1;
        }

        fn on_frames_skipped(&mut self, frame: u32, skipped: u32) {
            self.0.lock().unwrap().skipped.push((frame, skipped));
        }

        fn on_frame_regressed(&mut self, from: u32, to: u32) {
            self.0.lock().unwrap().regressed.push((from, to));
        }

        fn on_unrecognized_menu(&mut self, raw: i32) {
            self.0.lock().unwrap().unrecognized.push(raw);
        }

        fn on_dispatch(&mut self, frame: u32, _actions: &[ActionId]) {
            self.0.lock().unwrap().dispatch_frames.push(frame);
        }

        fn on_navigation_complete(&mut self) {
            self.0.lock().unwrap().navigation_complete += 1;
        }

        fn on_flush(&mut self, report: &FlushReport) {
            self.0.lock().unwrap().flushes.push(report.clone());
        }

        fn on_stats(&mut self, _report: &StatsReport) {
            self.0.lock().unwrap().stats += 1;
        }

        fn on_run_finished(&mut self, _report: &StatsReport) {
            self.0.lock().unwrap().finished += 1;
        }
    }

    struct Harness {
        control: ControlLoop<ChannelTransport>,
        sender: UnboundedSender<Delta>,
        pad: Arc<Mutex<Vec<PadCommand>>>,
        events: Arc<Mutex<Events>>,
    }

    impl Harness {
        fn new(config: RunConfig) -> Self {
            let (sender, transport) = ChannelTransport::new();
            let (pad, log) = RecordingPad::new();
            let events = Arc::new(Mutex::new(Events::default()));
            let control = ControlLoop::new(
                &config,
                LocationRegistry::new(&TRACKED_PORTS),
                transport,
                vec![Box::new(pad) as Box<dyn ControllerSink>],
                CountingObserver(Arc::clone(&events)),
            )
            .unwrap();

            Self {
                control,
                sender,
                pad: log,
                events,
            }
        }

        fn send(&self, location: String, value: u32) {
            self.sender.send(Delta::new(location, value)).unwrap();
        }

        async fn frame(&mut self, frame: u32, menu: u32) {
            self.send(LocationRegistry::frame_location(), frame);
            self.send(LocationRegistry::menu_location(), menu);
            self.control.advance_frame().await.unwrap();
        }

        fn commands(&self) -> Vec<PadCommand> {
            self.pad.lock().unwrap().clone()
        }
    }

    fn config(dir: &Path) -> RunConfig {
        RunConfig {
            path: dir.to_path_buf(),
            seed: Some(11),
            dump: false,
            ..RunConfig::default()
        }
    }

    fn recorder(dir: &Path, dump_size: usize) -> ExperienceRecorder {
        let config = RecorderConfig {
            dump_dir: dir.join("experience"),
            reward_log: dir.join("rewards.log"),
            tag: None,
            dump_size,
            dump_max: 10,
        };
        ExperienceRecorder::new(config, Box::new(DamageReward::new(1, 0))).unwrap()
    }

    #[tokio::test]
    async fn test_hundred_frames_dispatch_twenty_times() {
        let dir = tempfile::tempdir().unwrap();
        let mut harness = Harness::new(config(dir.path()));

        for frame in 1..=100 {
            harness.frame(frame, GAME).await;
        }

        assert_eq!(harness.control.stats().dispatches, 20);
        assert_eq!(harness.events.lock().unwrap().dispatch_frames.len(), 20);
    }

    #[tokio::test]
    async fn test_repeated_frame_does_not_dispatch() {
        let dir = tempfile::tempdir().unwrap();
        let config = RunConfig {
            act_every: 1,
            ..config(dir.path())
        };
        let mut harness = Harness::new(config);

        harness.frame(1, GAME).await;
        harness.frame(1, GAME).await;
        harness.frame(1, GAME).await;
        harness.frame(2, GAME).await;

        assert_eq!(harness.events.lock().unwrap().dispatch_frames, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_skip_accounting_through_the_loop() {
        let dir = tempfile::tempdir().unwrap();
        let mut harness = Harness::new(config(dir.path()));

        for frame in [10, 12, 13, 16] {
            harness.frame(frame, GAME).await;
        }

        let stats = harness.control.stats();
        assert_eq!(stats.skip_frames, 3);
        assert_eq!(stats.total_frames, 6);
        assert_eq!(harness.events.lock().unwrap().skipped, vec![(12, 1), (16, 2)]);
    }

    #[tokio::test]
    async fn test_waits_for_frame_counter_before_acting() {
        let dir = tempfile::tempdir().unwrap();
        let mut harness = Harness::new(config(dir.path()));
        let (cursor_x, _) = LocationRegistry::cursor_locations(1);

        // Menu reads as character select and the frame as 0, but neither was delivered
        harness.send(cursor_x, 5.0f32.to_bits());
        harness.control.advance_frame().await.unwrap();
        assert!(harness.commands().is_empty());

        for frame in [10, 12, 13, 16] {
            harness.frame(frame, GAME).await;
        }

        let stats = harness.control.stats();
        assert_eq!(stats.skip_frames, 3);
        assert_eq!(stats.total_frames, 6);
        assert_eq!(harness.events.lock().unwrap().skipped, vec![(12, 1), (16, 2)]);
    }

    #[tokio::test]
    async fn test_end_to_end_capture() {
        let dir = tempfile::tempdir().unwrap();
        let control_config = config(dir.path());
        let mut harness = Harness::new(control_config);
        harness.control = harness.control.with_recorder(recorder(dir.path(), 5));

        for frame in 1..=20 {
            harness.frame(frame, GAME).await;
        }
        assert_eq!(
            harness.events.lock().unwrap().dispatch_frames,
            vec![5, 10, 15, 20]
        );
        assert!(harness.events.lock().unwrap().flushes.is_empty());

        for frame in 21..=25 {
            harness.frame(frame, GAME).await;
        }

        let events = harness.events.lock().unwrap();
        assert_eq!(events.dispatch_frames, vec![5, 10, 15, 20, 25]);
        assert_eq!(events.flushes.len(), 1);
        assert_eq!(events.flushes[0].path, dir.path().join("experience").join(".dead"));

        // Records are in dispatch order
        let recorder = harness.control.recorder().unwrap();
        let frames: Vec<u32> = recorder
            .window()
            .iter()
            .map(|record| record.state.as_ref().unwrap().frame)
            .collect();
        assert_eq!(frames, vec![5, 10, 15, 20, 25]);

        let log = std::fs::read_to_string(dir.path().join("rewards.log")).unwrap();
        assert_eq!(log.lines().count(), 1);
    }

    #[tokio::test]
    async fn test_recorded_actions_chain() {
        let dir = tempfile::tempdir().unwrap();
        let config = RunConfig {
            act_every: 1,
            ..config(dir.path())
        };
        let mut harness = Harness::new(config);
        harness.control = harness.control.with_recorder(recorder(dir.path(), 4));

        for frame in 1..=3 {
            harness.frame(frame, GAME).await;
        }

        let window = harness.control.recorder().unwrap().window();
        assert_eq!(window[0].prev_action, NEUTRAL);
        assert_eq!(window[1].prev_action, window[0].action);
        assert_eq!(window[2].prev_action, window[1].action);
    }

    #[tokio::test]
    async fn test_frame_regression_is_logged_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let mut harness = Harness::new(config(dir.path()));

        for frame in [100, 40, 41] {
            harness.frame(frame, GAME).await;
        }

        let stats = harness.control.stats();
        assert_eq!(stats.regressions, 1);
        assert_eq!(stats.skip_frames, 0);
        assert_eq!(harness.events.lock().unwrap().regressed, vec![(100, 40)]);
    }

    #[tokio::test]
    async fn test_menus_then_settings_then_macro() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let mut harness = Harness::new(config.clone());
        let menu = Menu::Characters as u32;
        let (cursor_x, cursor_y) = LocationRegistry::cursor_locations(1);

        let (x, y) = Character::Zelda.cursor_target();
        harness.send(cursor_x.clone(), x.to_bits());
        harness.send(cursor_y.clone(), y.to_bits());
        harness.frame(1, menu).await;
        harness.frame(2, menu).await;
        assert_eq!(
            harness.commands(),
            vec![
                PadCommand::NEUTRAL_STICK,
                PadCommand::Press(Button::A),
                PadCommand::Release(Button::A),
            ]
        );

        harness.send(cursor_x, SETTINGS_TARGET.0.to_bits());
        harness.send(cursor_y, SETTINGS_TARGET.1.to_bits());
        harness.frame(3, menu).await;
        harness.frame(4, menu).await;
        assert_eq!(harness.commands().len(), 6);

        for frame in 5..300 {
            harness.frame(frame, Menu::Stages as u32).await;
        }

        let expected: Vec<PadCommand> = endless_netplay(config.stage)
            .iter()
            .map(|step| step.command)
            .collect();
        let commands = harness.commands();
        assert_eq!(&commands[6..], expected.as_slice());
        assert_eq!(harness.events.lock().unwrap().navigation_complete, 1);

        harness.control.reset_navigation();
        harness.frame(300, menu).await;
        // Seeking again: one stick tilt toward the character
        assert_eq!(harness.commands().len(), commands.len() + 1);
    }

    #[tokio::test]
    async fn test_post_game_toggles_start() {
        let dir = tempfile::tempdir().unwrap();
        let mut harness = Harness::new(config(dir.path()));
        let post_game = Menu::PostGame as u32;

        harness.frame(1, post_game).await;
        harness.frame(1, post_game).await;
        harness.frame(2, post_game).await;
        harness.frame(3, post_game).await;

        assert_eq!(
            harness.commands(),
            vec![
                PadCommand::Release(Button::Start),
                PadCommand::Press(Button::Start),
                PadCommand::Release(Button::Start),
            ]
        );
        // Not decimated, and never counted as match frames
        assert_eq!(harness.control.stats().dispatches, 0);
    }

    #[tokio::test]
    async fn test_unrecognized_menu_does_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut harness = Harness::new(config(dir.path()));

        harness.frame(1, 7).await;
        harness.frame(2, 7).await;

        assert!(harness.commands().is_empty());
        assert_eq!(harness.events.lock().unwrap().unrecognized, vec![7, 7]);
    }

    #[tokio::test]
    async fn test_cancelled_run_reports_and_returns() {
        let dir = tempfile::tempdir().unwrap();
        let mut harness = Harness::new(config(dir.path()));
        let (handle, token) = run_token();
        handle.cancel();

        let report = harness.control.run(token, None).await.unwrap();

        assert_eq!(report.total_frames, 0);
        let events = harness.events.lock().unwrap();
        assert_eq!(events.started, 1);
        assert_eq!(events.finished, 1);
    }

    #[tokio::test]
    async fn test_cancel_while_waiting_for_deltas() {
        let dir = tempfile::tempdir().unwrap();
        let mut harness = Harness::new(config(dir.path()));
        let (handle, token) = run_token();

        harness.send(LocationRegistry::frame_location(), 1);
        harness.send(LocationRegistry::menu_location(), GAME);
        let canceller = tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            handle.cancel();
        });

        let result = tokio::time::timeout(
            std::time::Duration::from_secs(2),
            harness.control.run(token, None),
        )
        .await
        .unwrap();
        canceller.await.unwrap();

        assert!(result.is_ok());
        assert_eq!(harness.control.state().frame, 1);
    }

    #[tokio::test]
    async fn test_closed_transport_is_fatal_but_reported() {
        let dir = tempfile::tempdir().unwrap();
        let Harness {
            mut control,
            sender,
            events,
            ..
        } = Harness::new(config(dir.path()));
        let (_handle, token) = run_token();
        drop(sender);

        let result = control.run(token, None).await;

        assert!(matches!(result, Err(BridgeError::TransportClosed { .. })));
        assert_eq!(events.lock().unwrap().finished, 1);
    }

    #[tokio::test]
    async fn test_unknown_location_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let mut harness = Harness::new(config(dir.path()));

        harness.send("DEADBEEF".to_string(), 1);
        let result = harness.control.advance_frame().await;
        assert!(matches!(result, Err(BridgeError::UnknownLocation { .. })));
    }

    #[test]
    fn test_pad_count_must_match_participants() {
        let dir = tempfile::tempdir().unwrap();
        let config = RunConfig {
            self_play: true,
            agent: AgentKind::Idle,
            ..config(dir.path())
        };
        let (_sender, transport) = ChannelTransport::new();
        let (pad, _log) = RecordingPad::new();
        let events = Arc::new(Mutex::new(Events::default()));

        let result = ControlLoop::new(
            &config,
            LocationRegistry::new(&TRACKED_PORTS),
            transport,
            vec![Box::new(pad) as Box<dyn ControllerSink>],
            CountingObserver(events),
        );
        assert!(matches!(
            result,
            Err(BridgeError::InvalidConfig { field: "pads", .. })
        ));
    }
}
