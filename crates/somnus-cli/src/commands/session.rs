use std::time::Duration;

use clap::Subcommand;
use somnus_core::{
    Clock, Collaborators, Config, Database, GestureKind, MediaEvent, MonotonicClock,
    SessionEvent, SessionOrchestrator, SessionState, TerminalNotifier, TrackId, TrackSequencer,
};
use tracing::info;

use super::headless::HeadlessHost;

#[derive(Subcommand)]
pub enum SessionAction {
    /// Run a session in the foreground, printing events as JSON lines
    Run {
        /// Countdown length in minutes (default: timer.duration_min)
        #[arg(long)]
        minutes: Option<u32>,
        /// Master volume 0.0-1.0 (default: audio.master_volume)
        #[arg(long)]
        volume: Option<f32>,
        /// Skip the guided track and start on the ambient loop
        #[arg(long)]
        no_meditation: bool,
        /// Raise the alarm when the countdown completes
        #[arg(long)]
        alarm: bool,
        /// Length of the guided track, in seconds
        #[arg(long, default_value_t = 600)]
        primary_secs: u64,
        /// Seconds the alarm rings before it is acknowledged
        #[arg(long, default_value_t = 30)]
        alarm_secs: u64,
        /// Print every countdown tick
        #[arg(long)]
        ticks: bool,
    },
    /// Print the settings a new session would start with
    Settings,
}

struct RunOptions {
    primary_len: Duration,
    alarm_len: Duration,
    ticks: bool,
}

pub fn run(action: SessionAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        SessionAction::Run {
            minutes,
            volume,
            no_meditation,
            alarm,
            primary_secs,
            alarm_secs,
            ticks,
        } => {
            let config = Config::load()?;
            let (mut session, host, clock) = build_session(&config)?;
            if let Some(volume) = volume {
                session.set_volume(volume);
            }
            if no_meditation {
                session.set_meditation_enabled(false);
            }
            if alarm {
                session.set_alarm_enabled(true);
            }
            if let Some(minutes) = minutes {
                session.set_duration(minutes)?;
            }
            // Replace configuration-time events with one snapshot of the result.
            session.drain_events();
            print_event(&session.snapshot(), false)?;

            let options = RunOptions {
                primary_len: Duration::from_secs(primary_secs),
                alarm_len: Duration::from_secs(alarm_secs),
                ticks,
            };
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()?;
            runtime.block_on(drive(session, host, clock, options))
        }
        SessionAction::Settings => {
            let config = Config::load()?;
            let json = serde_json::to_string_pretty(&config.session_settings())?;
            println!("{json}");
            Ok(())
        }
    }
}

/// Session wired to the headless host, on-disk history and stdout notifications.
fn build_session(
    config: &Config,
) -> Result<(SessionOrchestrator, HeadlessHost, MonotonicClock), Box<dyn std::error::Error>> {
    let clock = MonotonicClock::new();
    let host = HeadlessHost::new();
    let sequencer = TrackSequencer::with_host(
        Box::new(host.clone()),
        None,
        config.sources(),
        config.sequencer_config(),
    );
    let collaborators = Collaborators {
        clock: Box::new(clock),
        store: Box::new(Database::open()?),
        notifier: Box::new(TerminalNotifier),
    };
    let session = SessionOrchestrator::new(config.session_settings(), sequencer, collaborators)?;
    Ok((session, host, clock))
}

async fn drive(
    mut session: SessionOrchestrator,
    host: HeadlessHost,
    clock: MonotonicClock,
    options: RunOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    // A terminal invocation is itself the user gesture.
    session.observe_gesture(GestureKind::Key);
    session.set_playing(true);

    let mut primary_end: Option<Duration> = None;
    let mut alarm_end: Option<Duration> = None;

    loop {
        for event in session.drain_events() {
            if matches!(event, SessionEvent::AlarmRaised { .. }) {
                alarm_end = Some(clock.now() + options.alarm_len);
            }
            print_event(&event, options.ticks)?;
        }
        if host.take_finite_plays().contains(&TrackId::Primary) {
            primary_end = Some(clock.now() + options.primary_len);
        }
        if session.state() != SessionState::Running && !session.alarm_active() {
            break;
        }

        let wake = [session.next_deadline(), primary_end, alarm_end]
            .into_iter()
            .flatten()
            .min();
        let sleep = async {
            match wake {
                Some(at) => tokio::time::sleep_until(clock.instant_at(at).into()).await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            result = &mut ctrl_c => {
                result?;
                if session.alarm_active() {
                    info!("interrupted; acknowledging alarm");
                    session.acknowledge_alarm();
                } else {
                    info!("interrupted; stopping session");
                    session.stop();
                }
                for event in session.drain_events() {
                    print_event(&event, options.ticks)?;
                }
                break;
            }
            _ = sleep => {}
        }

        let now = clock.now();
        if primary_end.is_some_and(|at| at <= now) {
            primary_end = None;
            session.handle_media_event(MediaEvent::Ended {
                track: TrackId::Primary,
            });
        }
        if alarm_end.is_some_and(|at| at <= now) {
            alarm_end = None;
            session.acknowledge_alarm();
        }
        session.advance();
    }

    Ok(())
}

fn print_event(event: &SessionEvent, ticks: bool) -> Result<(), serde_json::Error> {
    if matches!(event, SessionEvent::Tick { .. }) && !ticks {
        return Ok(());
    }
    println!("{}", serde_json::to_string(event)?);
    Ok(())
}
