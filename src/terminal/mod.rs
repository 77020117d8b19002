// ABOUTME: Terminal layer: streams, emulator views, geometry sync, output scanning, sessions

pub mod geometry;
pub mod keys;
pub mod local_pty;
pub mod scanner;
pub mod session;
pub mod stream;
pub mod view;

pub use geometry::{CellMetrics, ContainerSize, FitPass, GeometryAdapter, GeometryError, SettleDelays};
pub use local_pty::LocalPtyConnector;
pub use session::{SessionBackends, SessionError, TerminalSession};
pub use stream::{
    OutboundFrame, StreamConnection, StreamConnector, StreamError, StreamEvent, StreamParams,
    StreamSink, WsStreamConnector,
};
pub use view::{TerminalView, ViewFactory, Vt100View, Vt100ViewFactory};
