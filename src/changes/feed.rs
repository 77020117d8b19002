// ABOUTME: Filesystem-change feeds: a local notify watcher and the remote websocket feed
//
// Both feeds only post `DeckEvent::FsChange` into the app queue. Malformed
// remote payloads are dropped. Unlike terminal streams, the remote feed
// reconnects with exponential backoff.

use crate::error::ServiceError;
use crate::events::DeckEvent;
use crate::models::{FsChange, FsEventKind};
use crate::terminal::stream::{websocket_url, StreamError};
use futures_util::StreamExt;
use notify::event::{CreateKind, ModifyKind, RemoveKind, RenameMode};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use serde::Deserialize;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};
use url::Url;

const INITIAL_BACKOFF: Duration = Duration::from_millis(500);
const MAX_BACKOFF: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct FeedMessage {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    path: Option<String>,
    #[serde(default)]
    event: Option<FsEventKind>,
}

/// Parse one `{"type":"fs_change","path":..,"event":..}` payload
pub fn parse_feed_message(text: &str) -> Option<FsChange> {
    let message: FeedMessage = match serde_json::from_str(text) {
        Ok(message) => message,
        Err(err) => {
            debug!("Dropping malformed feed message: {}", err);
            return None;
        }
    };
    if message.kind != "fs_change" {
        return None;
    }
    match (message.path, message.event) {
        (Some(path), Some(kind)) if !path.is_empty() => Some(FsChange::new(path, kind)),
        _ => {
            debug!("Dropping incomplete fs_change message");
            None
        }
    }
}

/// Watches a directory tree and posts changes for files inside it
pub struct LocalChangeWatcher {
    root: PathBuf,
    _watcher: RecommendedWatcher,
}

impl std::fmt::Debug for LocalChangeWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalChangeWatcher")
            .field("root", &self.root)
            .finish()
    }
}

impl LocalChangeWatcher {
    /// Start watching `root` recursively. The watcher stops when dropped.
    pub fn start(
        root: &Path,
        ignore: Vec<String>,
        tx: mpsc::UnboundedSender<DeckEvent>,
    ) -> Result<Self, ServiceError> {
        let mut watcher = notify::recommended_watcher(
            move |result: notify::Result<notify::Event>| match result {
                Ok(event) => {
                    for change in changes_from_event(&event, &ignore) {
                        if tx.send(DeckEvent::FsChange(change)).is_err() {
                            return;
                        }
                    }
                }
                Err(err) => debug!("File watcher error: {}", err),
            },
        )?;
        watcher.watch(root, RecursiveMode::Recursive)?;
        info!("Watching {} for file changes", root.display());

        Ok(Self {
            root: root.to_path_buf(),
            _watcher: watcher,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Map a notify event to change notifications. Directories, metadata-only
/// updates and ignored paths produce nothing.
pub fn changes_from_event(event: &notify::Event, ignore: &[String]) -> Vec<FsChange> {
    let kinds: Vec<(usize, FsEventKind)> = match event.kind {
        EventKind::Create(CreateKind::Folder) | EventKind::Remove(RemoveKind::Folder) => {
            Vec::new()
        }
        EventKind::Create(_) => (0..event.paths.len())
            .map(|i| (i, FsEventKind::Created))
            .collect(),
        EventKind::Remove(_) => (0..event.paths.len())
            .map(|i| (i, FsEventKind::Deleted))
            .collect(),
        EventKind::Modify(ModifyKind::Metadata(_)) => Vec::new(),
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => vec![(0, FsEventKind::Deleted)],
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => vec![(0, FsEventKind::Created)],
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            vec![(0, FsEventKind::Deleted), (1, FsEventKind::Created)]
        }
        EventKind::Modify(_) => (0..event.paths.len())
            .map(|i| (i, FsEventKind::Modified))
            .collect(),
        _ => Vec::new(),
    };

    kinds
        .into_iter()
        .filter_map(|(idx, kind)| {
            let path = event.paths.get(idx)?;
            if is_ignored(path, ignore) {
                return None;
            }
            if kind != FsEventKind::Deleted && path.is_dir() {
                return None;
            }
            Some(FsChange::new(path.to_string_lossy(), kind))
        })
        .collect()
}

fn is_ignored(path: &Path, ignore: &[String]) -> bool {
    if path
        .components()
        .any(|c| matches!(c, Component::Normal(name) if name == ".git"))
    {
        return true;
    }
    let text = path.to_string_lossy();
    ignore
        .iter()
        .any(|fragment| !fragment.is_empty() && text.contains(fragment.as_str()))
}

/// `ws(s)://host/ws/events`
pub fn feed_endpoint(server_url: &str) -> Result<Url, StreamError> {
    let base = Url::parse(server_url).map_err(|e| StreamError::InvalidEndpoint(e.to_string()))?;
    websocket_url(&base, "ws/events")
}

/// Subscribe to the remote change feed. The task runs until the app queue
/// closes or the handle is aborted.
pub fn spawn_remote_feed(
    server_url: &str,
    tx: mpsc::UnboundedSender<DeckEvent>,
) -> Result<JoinHandle<()>, StreamError> {
    let url = feed_endpoint(server_url)?;
    Ok(tokio::spawn(run_remote_feed(url, tx)))
}

async fn run_remote_feed(url: Url, tx: mpsc::UnboundedSender<DeckEvent>) {
    let mut backoff = INITIAL_BACKOFF;
    loop {
        match connect_async(url.as_str()).await {
            Ok((mut ws, _)) => {
                info!("Connected to change feed {}", url);
                backoff = INITIAL_BACKOFF;
                while let Some(message) = ws.next().await {
                    let text = match message {
                        Ok(Message::Text(text)) => text,
                        Ok(Message::Binary(bytes)) => match String::from_utf8(bytes) {
                            Ok(text) => text,
                            Err(_) => continue,
                        },
                        Ok(Message::Close(_)) => break,
                        Ok(_) => continue,
                        Err(err) => {
                            warn!("Change feed error: {}", err);
                            break;
                        }
                    };
                    if let Some(change) = parse_feed_message(&text) {
                        if tx.send(DeckEvent::FsChange(change)).is_err() {
                            return;
                        }
                    }
                }
            }
            Err(err) => warn!("Change feed connect failed: {}", err),
        }

        if tx.is_closed() {
            return;
        }
        debug!("Reconnecting change feed in {:?}", backoff);
        tokio::time::sleep(backoff).await;
        backoff = (backoff * 2).min(MAX_BACKOFF);
    }
}
