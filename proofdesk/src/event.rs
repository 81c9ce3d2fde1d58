//! Event bus for proofdesk.
//!
//! Terminal input, timer ticks, and API worker results are normalised into a
//! single `AppEvent` enum and sent over a tokio unbounded MPSC channel. The
//! main loop receives from this channel and dispatches accordingly.
//!
//! Two independent intervals drive the render and logic cycles:
//! - **Render interval** (33 ms, about 30 FPS) triggers a `terminal.draw()`.
//! - **Tick interval** (250 ms) expires notifications.

use crossterm::event::{Event, EventStream, KeyEvent, KeyEventKind, MouseEvent};
use futures::{FutureExt, StreamExt};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::interval;

use crate::worker::ApiResult;

/// All events the application can receive from any source.
#[derive(Debug)]
pub enum AppEvent {
    /// A key press (`KeyEventKind::Press` only; release and repeat are
    /// filtered so a keystroke never fires twice).
    Key(KeyEvent),
    Mouse(MouseEvent),
    /// Terminal was resized to (columns, rows).
    Resize(u16, u16),
    Tick,
    /// Triggers exactly one `terminal.draw()`.
    Render,
    /// Result from the API worker thread.
    Api(Box<ApiResult>),
    Quit,
}

/// Owns the event channel and the terminal input task.
///
/// The input task lives exactly as long as the handler: dropping it aborts
/// the task, so the keyboard listener is released on every exit path.
pub struct EventHandler {
    /// Send half; clone this for each background producer.
    pub tx: mpsc::UnboundedSender<AppEvent>,
    pub rx: mpsc::UnboundedReceiver<AppEvent>,
    input_task: JoinHandle<()>,
}

impl EventHandler {
    /// Creates the channel and spawns the input task. Must be called inside a
    /// tokio runtime.
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let input_task = spawn_event_task(tx.clone());
        Self { tx, rx, input_task }
    }
}

impl Drop for EventHandler {
    fn drop(&mut self) {
        self.input_task.abort();
    }
}

/// Drives the channel from crossterm's `EventStream` and the two timers.
///
/// `reader.next().fuse()` keeps `select!` from polling a completed future if
/// the crossterm stream ends. Send errors mean the receiver is gone; the
/// task stops.
fn spawn_event_task(tx: mpsc::UnboundedSender<AppEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut tick_interval = interval(Duration::from_millis(250));
        let mut render_interval = interval(Duration::from_millis(33));
        let mut reader = EventStream::new();

        loop {
            let tick_tick = tick_interval.tick();
            let render_tick = render_interval.tick();
            let crossterm_event = reader.next().fuse();

            let sent = tokio::select! {
                _ = tick_tick => tx.send(AppEvent::Tick),
                _ = render_tick => tx.send(AppEvent::Render),
                maybe_event = crossterm_event => match maybe_event {
                    Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                        tx.send(AppEvent::Key(key))
                    }
                    Some(Ok(Event::Resize(w, h))) => tx.send(AppEvent::Resize(w, h)),
                    Some(Ok(Event::Mouse(mouse))) => tx.send(AppEvent::Mouse(mouse)),
                    Some(Ok(_)) => Ok(()),
                    Some(Err(_)) | None => tx.send(AppEvent::Quit),
                },
            };
            if sent.is_err() {
                break;
            }
        }
    })
}
