pub mod state;
pub mod view;

use crate::models::PlaybackSnapshot;
use crate::util::config::WidgetConfig;
use crate::util::mailbox::{AsyncInboxHandler, Envelope, Outbox, create_mailbox};
use crate::util::source::SharedSource;
use crate::util::task::{AddTask, TasksManager};
use async_trait::async_trait;
use futures::FutureExt;
use state::{DeviceCapabilities, InputMode, Navigate, ProgressTimer, TickOutcome, WidgetState};
use std::fmt::{Display, Formatter};
use std::ops::ControlFlow;
use std::panic::AssertUnwindSafe;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};
use view::WidgetView;

#[derive(Clone, Copy, Debug)]
pub struct WidgetOptions {
    pub refresh_interval: Duration,
    pub progress_tick: Duration,
    pub capabilities: DeviceCapabilities,
}

impl Default for WidgetOptions {
    fn default() -> Self {
        Self {
            refresh_interval: Duration::from_secs(30),
            progress_tick: Duration::from_secs(1),
            capabilities: DeviceCapabilities::default(),
        }
    }
}

impl From<&WidgetConfig> for WidgetOptions {
    fn from(config: &WidgetConfig) -> Self {
        let touch = config.touch.unwrap_or(false);
        Self {
            refresh_interval: config.refresh_interval(),
            progress_tick: config.progress_tick(),
            capabilities: DeviceCapabilities {
                touch_events: touch,
                max_touch_points: 0,
            },
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
enum WidgetTask {
    Refresh,
    Progress,
}

impl Display for WidgetTask {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Refresh => write!(f, "widget_refresh"),
            Self::Progress => write!(f, "widget_progress"),
        }
    }
}

#[derive(Debug)]
enum WidgetMessage {
    Refresh,
    FetchCompleted(PlaybackSnapshot),
    ProgressTick { generation: u64 },
    PointerEnter,
    PointerLeave,
    ClickWidget,
    ClickListenLink,
    DocumentClick { inside: bool },
    Query,
    Teardown,
}

#[derive(Debug)]
enum WidgetReply {
    Done,
    Navigate(Option<Navigate>),
    State(Box<WidgetState>),
}

struct NowPlayingWidget {
    state: WidgetState,
    source: SharedSource,
    outbox: Outbox<WidgetMessage, WidgetReply>,
    tasks: TasksManager<WidgetTask>,
    fetches: JoinSet<()>,
    progress_generation: u64,
    progress_tick: Duration,
    publisher: watch::Sender<WidgetState>,
}

impl NowPlayingWidget {
    fn publish(&self) {
        self.publisher.send_replace(self.state.clone());
    }

    fn spawn_fetch(&mut self) {
        while self.fetches.try_join_next().is_some() {}

        let source = self.source.clone();
        let outbox = self.outbox.clone();
        self.fetches.spawn(async move {
            let snapshot = match AssertUnwindSafe(source.fetch_snapshot())
                .catch_unwind()
                .await
            {
                Ok(snapshot) => snapshot,
                Err(_) => {
                    tracing::warn!(
                        "Source [{}] panicked while fetching, treating as not playing",
                        source.get_name()
                    );
                    PlaybackSnapshot::NotPlaying
                }
            };
            outbox
                .send_message(WidgetMessage::FetchCompleted(snapshot))
                .await;
        });
    }

    fn start_refresh_timer(&self, every: Duration) {
        let outbox = self.outbox.clone();
        self.tasks.add(AddTask {
            key: WidgetTask::Refresh,
            duration: every,
            handler: move || {
                let outbox = outbox.clone();
                async move {
                    outbox.send_message(WidgetMessage::Refresh).await;
                }
            },
        });
    }

    fn restart_progress_timer(&mut self) {
        self.progress_generation += 1;
        let generation = self.progress_generation;
        let outbox = self.outbox.clone();
        self.tasks.add(AddTask {
            key: WidgetTask::Progress,
            duration: self.progress_tick,
            handler: move || {
                let outbox = outbox.clone();
                async move {
                    outbox
                        .send_message(WidgetMessage::ProgressTick { generation })
                        .await;
                }
            },
        });
    }

    fn stop_progress_timer(&mut self) {
        self.progress_generation += 1;
        self.tasks.remove(&WidgetTask::Progress);
    }

    fn apply_snapshot(&mut self, snapshot: PlaybackSnapshot) {
        tracing::debug!("Applying snapshot {:?}", snapshot);
        match self.state.apply_snapshot(snapshot) {
            ProgressTimer::Restart => self.restart_progress_timer(),
            ProgressTimer::Stop => self.stop_progress_timer(),
        }
        self.publish();
    }

    fn progress_tick(&mut self, generation: u64) {
        if generation != self.progress_generation {
            tracing::trace!("Dropped stale progress tick from generation {}", generation);
            return;
        }
        let step = self.progress_tick.as_millis() as u64;
        match self.state.tick(step) {
            TickOutcome::Advanced => self.publish(),
            TickOutcome::ReachedEnd => {
                tracing::debug!("Track reached its end, refreshing early");
                self.publish();
                self.spawn_fetch();
            }
            TickOutcome::AtEnd | TickOutcome::Ignored => {}
        }
    }

    fn teardown(&mut self) {
        self.tasks.remove_all();
        self.fetches.abort_all();
        self.progress_generation += 1;
        tracing::info!("Now playing widget torn down");
    }

    /// Returns the reply for requests, or None when the message asked to stop.
    fn dispatch(&mut self, message: WidgetMessage) -> Option<WidgetReply> {
        let reply = match message {
            WidgetMessage::Refresh => {
                self.spawn_fetch();
                WidgetReply::Done
            }
            WidgetMessage::FetchCompleted(snapshot) => {
                self.apply_snapshot(snapshot);
                WidgetReply::Done
            }
            WidgetMessage::ProgressTick { generation } => {
                self.progress_tick(generation);
                WidgetReply::Done
            }
            WidgetMessage::PointerEnter => {
                if self.state.pointer_enter() {
                    self.publish();
                }
                WidgetReply::Done
            }
            WidgetMessage::PointerLeave => {
                if self.state.pointer_leave() {
                    self.publish();
                }
                WidgetReply::Done
            }
            WidgetMessage::ClickWidget => {
                let before = self.state.mutations();
                let navigate = self.state.click_widget();
                if self.state.mutations() != before {
                    self.publish();
                }
                WidgetReply::Navigate(navigate)
            }
            WidgetMessage::ClickListenLink => WidgetReply::Navigate(self.state.click_listen_link()),
            WidgetMessage::DocumentClick { inside } => {
                if self.state.document_click(inside) {
                    self.publish();
                }
                WidgetReply::Done
            }
            WidgetMessage::Query => WidgetReply::State(Box::new(self.state.clone())),
            WidgetMessage::Teardown => {
                self.teardown();
                return None;
            }
        };
        Some(reply)
    }
}

#[async_trait]
impl AsyncInboxHandler<WidgetMessage, WidgetReply> for NowPlayingWidget {
    async fn handle(
        &mut self,
        mut envelope: Envelope<WidgetMessage, WidgetReply>,
    ) -> ControlFlow<()> {
        let Some(message) = envelope.take_data() else {
            return ControlFlow::Continue(());
        };
        match self.dispatch(message) {
            Some(reply) => {
                envelope.reply(reply);
                ControlFlow::Continue(())
            }
            None => {
                envelope.reply(WidgetReply::Done);
                ControlFlow::Break(())
            }
        }
    }
}

/// Owner side of a mounted widget. Dropping it without [`WidgetHandle::teardown`] aborts the widget.
pub struct WidgetHandle {
    outbox: Outbox<WidgetMessage, WidgetReply>,
    state: watch::Receiver<WidgetState>,
    runner: Option<JoinHandle<()>>,
}

impl WidgetHandle {
    /// Mounts a widget on the current tokio runtime: fetches right away, then on every refresh interval.
    pub fn mount(source: SharedSource, options: WidgetOptions) -> Self {
        let input_mode = InputMode::detect(options.capabilities);
        let state = WidgetState::new(input_mode);
        let (publisher, receiver) = watch::channel(state.clone());
        let (outbox, inbox) = create_mailbox();

        let widget = NowPlayingWidget {
            state,
            source,
            outbox: outbox.clone(),
            tasks: TasksManager::new(),
            fetches: JoinSet::new(),
            progress_generation: 0,
            progress_tick: options.progress_tick,
            publisher,
        };

        outbox.post(WidgetMessage::Refresh);
        widget.start_refresh_timer(options.refresh_interval);

        tracing::info!(
            "Mounted now playing widget in {:?} mode, refreshing every {}s",
            input_mode,
            options.refresh_interval.as_secs()
        );

        let runner = tokio::spawn(inbox.run(widget));

        Self {
            outbox,
            state: receiver,
            runner: Some(runner),
        }
    }

    async fn request(&self, message: WidgetMessage) -> Option<WidgetReply> {
        self.outbox.send_request(message).await.await.ok()
    }

    pub async fn pointer_enter(&self) {
        self.outbox.send_message(WidgetMessage::PointerEnter).await;
    }

    pub async fn pointer_leave(&self) {
        self.outbox.send_message(WidgetMessage::PointerLeave).await;
    }

    /// A click or tap on the widget icon. Returns where to navigate, if anywhere.
    pub async fn click_widget(&self) -> Option<Navigate> {
        match self.request(WidgetMessage::ClickWidget).await {
            Some(WidgetReply::Navigate(navigate)) => navigate,
            _ => None,
        }
    }

    pub async fn click_listen_link(&self) -> Option<Navigate> {
        match self.request(WidgetMessage::ClickListenLink).await {
            Some(WidgetReply::Navigate(navigate)) => navigate,
            _ => None,
        }
    }

    /// Forwards a page level click or tap. `inside` tells whether it landed within the widget.
    pub async fn document_click(&self, inside: bool) {
        self.outbox
            .send_message(WidgetMessage::DocumentClick { inside })
            .await;
    }

    pub async fn refresh_now(&self) {
        self.outbox.send_message(WidgetMessage::Refresh).await;
    }

    /// State as seen after every message queued before this call was handled.
    pub async fn state(&self) -> Option<WidgetState> {
        match self.request(WidgetMessage::Query).await {
            Some(WidgetReply::State(state)) => Some(*state),
            _ => None,
        }
    }

    /// Last published state, without waiting on the queue.
    pub fn current(&self) -> WidgetState {
        self.state.borrow().clone()
    }

    pub fn view(&self) -> WidgetView {
        WidgetView::render(&self.state.borrow())
    }

    pub fn subscribe(&self) -> watch::Receiver<WidgetState> {
        self.state.clone()
    }

    /// Stops both timers and in flight fetches. No state change is published afterwards.
    pub async fn teardown(mut self) {
        self.request(WidgetMessage::Teardown).await;
        if let Some(runner) = self.runner.take() {
            let _ = runner.await;
        }
    }
}

impl Drop for WidgetHandle {
    fn drop(&mut self) {
        if let Some(runner) = self.runner.take() {
            runner.abort();
        }
    }
}
