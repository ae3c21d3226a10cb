use hicmax::engine::progress::{Progress, ProgressCallback};
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, watch};

const SPINNER_TEMPLATE: &str = "{spinner:.cyan} {msg} [{elapsed}]";
const BAR_TEMPLATE: &str = "{msg:<40} {wide_bar:.green/white} {pos:>3}/{len:3} eta {eta}";
const SPINNER_FRAMES: &[&str] = &["◐", "◓", "◑", "◒", "●"];

#[derive(Debug)]
pub enum UiEvent {
    Progress(Progress),
    Log(String),
}

/// The workflow phase currently on screen.
struct Phase {
    name: &'static str,
    bar: ProgressBar,
    started: Instant,
}

impl Phase {
    fn begin(mp: &MultiProgress, name: &'static str) -> Self {
        let bar = mp.add(ProgressBar::new_spinner());
        bar.set_style(spinner_style());
        bar.set_message(name);
        bar.enable_steady_tick(Duration::from_millis(100));
        Self {
            name,
            bar,
            started: Instant::now(),
        }
    }

    fn into_summary(self) -> String {
        self.bar.finish_and_clear();
        format!("✓ {} ({:.1?})", self.name, self.started.elapsed())
    }
}

/// Owns the terminal: draws one phase at a time and prints log lines above it.
pub struct UiManager {
    mp: MultiProgress,
    phase: Option<Phase>,
    events: mpsc::Receiver<UiEvent>,
    shutdown: watch::Receiver<bool>,
    // Keeps the multi-progress alive between phases so logs still route through it.
    _anchor: ProgressBar,
}

impl UiManager {
    pub fn new() -> (Self, mpsc::Sender<UiEvent>, watch::Sender<bool>) {
        let (event_sender, events) = mpsc::channel(1024);
        let (shutdown_sender, shutdown) = watch::channel(false);
        let mp = MultiProgress::with_draw_target(ProgressDrawTarget::stderr_with_hz(10));
        let _anchor = mp.add(ProgressBar::hidden());
        let manager = Self {
            mp,
            phase: None,
            events,
            shutdown,
            _anchor,
        };
        (manager, event_sender, shutdown_sender)
    }

    pub async fn run(mut self) {
        loop {
            tokio::select! {
                Some(event) = self.events.recv() => self.apply(event),
                changed = self.shutdown.changed() => {
                    if changed.is_err() || *self.shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        while let Ok(event) = self.events.try_recv() {
            self.apply(event);
        }
        if let Some(phase) = self.phase.take() {
            phase.bar.finish_and_clear();
        }
        self._anchor.finish_and_clear();
    }

    fn print(&self, line: impl AsRef<str>) {
        let _ = self.mp.println(line);
    }

    fn bar(&self) -> Option<&ProgressBar> {
        self.phase.as_ref().map(|p| &p.bar)
    }

    fn apply(&mut self, event: UiEvent) {
        let progress = match event {
            UiEvent::Log(line) => return self.print(line),
            UiEvent::Progress(progress) => progress,
        };
        match progress {
            Progress::PhaseStart { name } => {
                if let Some(previous) = self.phase.take() {
                    previous.bar.finish_and_clear();
                }
                self.phase = Some(Phase::begin(&self.mp, name));
            }
            Progress::PhaseFinish => {
                if let Some(phase) = self.phase.take() {
                    let summary = phase.into_summary();
                    self.print(summary);
                }
            }
            Progress::TaskStart { total_steps } => {
                if let Some(bar) = self.bar() {
                    bar.disable_steady_tick();
                    bar.set_style(bar_style());
                    bar.set_length(total_steps);
                    bar.reset();
                }
            }
            Progress::TaskIncrement => {
                if let Some(bar) = self.bar() {
                    bar.inc(1);
                }
            }
            Progress::TaskFinish => {
                if let Some(bar) = self.bar() {
                    bar.finish();
                }
            }
            Progress::Iteration { iteration, cost } => {
                if let Some(phase) = &self.phase {
                    phase
                        .bar
                        .set_message(format!("{} · it {} · cost {:.4}", phase.name, iteration, cost));
                }
            }
            Progress::Message(msg) => self.print(format!("  {}", msg)),
        }
    }
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template(SPINNER_TEMPLATE)
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(SPINNER_FRAMES)
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::with_template(BAR_TEMPLATE)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ")
}

#[derive(Clone)]
pub struct CliProgressHandler {
    sender: mpsc::Sender<UiEvent>,
}

impl CliProgressHandler {
    pub fn new(sender: mpsc::Sender<UiEvent>) -> Self {
        Self { sender }
    }

    /// Iteration events arrive far faster than the UI redraws; a full channel
    /// drops them silently while other events block until there is room.
    pub fn get_callback(&self) -> ProgressCallback<'static> {
        let sender = self.sender.clone();
        Box::new(move |progress: Progress| {
            let event = UiEvent::Progress(progress);
            if matches!(event, UiEvent::Progress(Progress::Iteration { .. })) {
                let _ = sender.try_send(event);
            } else {
                let _ = sender.blocking_send(event);
            }
        })
    }
}
