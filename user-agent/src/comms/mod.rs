//! Request/response plumbing between the driver and the dispatcher.
//!
//! Transport design
//! ─────────────────
//!   • **Frames**   ← a byte stream of `u32` LE length + `prost` message, the
//!     same record layout the driver's shared ring uses.
//!   • **Channels** ← in-process `crossbeam` queues, for tests and for
//!     embedding the dispatcher next to a driver shim.
//!
//! Both sides meet at `EventSink`: the dispatcher only ever "sends" a
//! response and never sees a transport error.

pub mod frames;
pub mod router;
pub mod transport;

pub use frames::{FrameReader, FrameWriter};
pub use router::RequestRouter;
pub use transport::{ChannelTransport, EventSink};
