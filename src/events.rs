// ABOUTME: Events posted by background tasks into the single app event queue
//
// Every task (stream readers, settle timers, diff fetches, usage polls, change
// feeds) only sends one of these. The app loop is the sole owner of session
// state and applies them in arrival order.

use crate::changes::DiffTicket;
use crate::error::ServiceError;
use crate::models::{FsChange, UsageSample};
use crate::terminal::{FitPass, StreamEvent};

#[derive(Debug)]
pub enum DeckEvent {
    /// Something happened on a slot's stream. `generation` identifies the
    /// launch the stream belongs to.
    Stream {
        slot: usize,
        generation: u64,
        event: StreamEvent,
    },
    /// A delayed geometry fit is due
    FitSettle {
        slot: usize,
        generation: u64,
        pass: FitPass,
    },
    /// Filesystem change from the local watcher or the remote feed
    FsChange(FsChange),
    DiffFetched {
        slot: usize,
        generation: u64,
        ticket: DiffTicket,
        result: Result<String, ServiceError>,
    },
    /// Time to poll the usage service
    UsageTick,
    /// Usage poll finished. `targets` are the `(slot, generation)` pairs that
    /// were live when the request went out, in request order.
    UsagePolled {
        targets: Vec<(usize, u64)>,
        result: Result<Vec<UsageSample>, ServiceError>,
    },
}
