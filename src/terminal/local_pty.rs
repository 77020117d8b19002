// ABOUTME: Local transport: runs the agent CLI in a native PTY
//
// Abstracts portable-pty behind the same `StreamConnector` interface as the
// websocket transport:
// - Spawns the agent (or a shell) in the slot's working directory
// - Pumps PTY output into the app queue from a reader thread
// - Applies resize frames directly to the PTY

use crate::config::AgentCommands;
use crate::terminal::stream::{
    OutboundFrame, StreamConnection, StreamConnector, StreamError, StreamParams, StreamSink,
};
use portable_pty::{native_pty_system, Child, ChildKiller, CommandBuilder, MasterPty, PtySize};
use std::io::{Read, Write};
use tracing::{debug, info, warn};

const READ_BUFFER_SIZE: usize = 8192;

/// Spawns agents in local pseudo-terminals
#[derive(Debug, Clone)]
pub struct LocalPtyConnector {
    commands: AgentCommands,
}

impl LocalPtyConnector {
    pub fn new(commands: AgentCommands) -> Self {
        Self { commands }
    }
}

impl StreamConnector for LocalPtyConnector {
    fn open(
        &self,
        params: StreamParams,
        sink: StreamSink,
    ) -> Result<Box<dyn StreamConnection>, StreamError> {
        let (program, args) = self.commands.command_for(params.agent, params.yolo);
        which::which(&program).map_err(|_| StreamError::AgentNotFound(program.clone()))?;

        let pty_system = native_pty_system();
        let pair = pty_system
            .openpty(pty_size(params.geometry.cols, params.geometry.rows))
            .map_err(|e| StreamError::Pty(e.to_string()))?;

        let mut cmd = CommandBuilder::new(&program);
        cmd.args(&args);
        cmd.cwd(&params.cwd);
        cmd.env("TERM", "xterm-256color");

        let child = pair
            .slave
            .spawn_command(cmd)
            .map_err(|e| StreamError::Pty(e.to_string()))?;
        // The child holds its own handle to the slave side
        drop(pair.slave);

        let reader = pair
            .master
            .try_clone_reader()
            .map_err(|e| StreamError::Pty(e.to_string()))?;
        let writer = pair
            .master
            .take_writer()
            .map_err(|e| StreamError::Pty(e.to_string()))?;

        info!(
            "Spawned '{}' for slot {} in {} ({})",
            program,
            sink.slot(),
            params.cwd.display(),
            params.geometry
        );

        // Opened must be queued before the reader can post any output
        sink.opened();
        let slot = sink.slot();
        std::thread::Builder::new()
            .name(format!("pty-reader-{}", slot))
            .spawn(move || pump_output(reader, &sink))?;

        Ok(Box::new(LocalPtyConnection {
            master: Some(pair.master),
            writer: Some(writer),
            child: Some(child),
        }))
    }
}

fn pty_size(cols: u16, rows: u16) -> PtySize {
    PtySize {
        rows,
        cols,
        pixel_width: 0,
        pixel_height: 0,
    }
}

fn pump_output(mut reader: Box<dyn Read + Send>, sink: &StreamSink) {
    let mut buf = [0u8; READ_BUFFER_SIZE];
    loop {
        match reader.read(&mut buf) {
            Ok(0) => {
                sink.closed(Some("process exited".to_string()));
                break;
            }
            Ok(n) => {
                if !sink.data(buf[..n].to_vec()) {
                    break;
                }
            }
            Err(err) => {
                // Linux reports EIO on the master once the child is gone
                debug!("PTY read ended for slot {}: {}", sink.slot(), err);
                sink.closed(Some("process exited".to_string()));
                break;
            }
        }
    }
}

/// Wait for a killed child off the app thread so it never lingers as a zombie
fn reap_in_background(mut child: Box<dyn Child + Send + Sync>) {
    let spawned = std::thread::Builder::new()
        .name("pty-reaper".to_string())
        .spawn(move || match child.wait() {
            Ok(status) => debug!("PTY child exited: {:?}", status),
            Err(err) => warn!("Failed to reap PTY child: {}", err),
        });
    if let Err(err) = spawned {
        warn!("Failed to spawn PTY reaper: {}", err);
    }
}

struct LocalPtyConnection {
    master: Option<Box<dyn MasterPty + Send>>,
    writer: Option<Box<dyn Write + Send>>,
    child: Option<Box<dyn Child + Send + Sync>>,
}

impl StreamConnection for LocalPtyConnection {
    fn send(&mut self, frame: OutboundFrame) -> Result<(), StreamError> {
        match frame {
            OutboundFrame::Input(bytes) => {
                let writer = self.writer.as_mut().ok_or(StreamError::Closed)?;
                writer.write_all(&bytes)?;
                writer.flush()?;
            }
            OutboundFrame::Resize(geometry) => {
                let master = self.master.as_ref().ok_or(StreamError::Closed)?;
                master
                    .resize(pty_size(geometry.cols, geometry.rows))
                    .map_err(|e| StreamError::Pty(e.to_string()))?;
            }
        }
        Ok(())
    }

    fn close(&mut self) {
        self.writer.take();
        if let Some(mut child) = self.child.take() {
            if let Err(err) = child.kill() {
                // Already exited
                debug!("PTY child kill: {}", err);
            }
            reap_in_background(child);
        }
        self.master.take();
    }
}

impl Drop for LocalPtyConnection {
    fn drop(&mut self) {
        self.close();
    }
}
