//! Length-prefixed `prost` frames over any byte stream.
//!
//! ```text
//! ┌──────────────┬──────────────────────────┐
//! │ len: u32 LE  │ len bytes of protobuf    │
//! └──────────────┴──────────────────────────┘
//! ```

use std::{
    io::{self, Read, Write},
    marker::PhantomData,
    sync::{Mutex, PoisonError},
};

use prost::Message;
use shared::constants::{FRAME_HEADER_LEN, MAX_FRAME_LEN};
use shared::events::{EventContext, EventInformation};

use crate::comms::transport::EventSink;
use crate::error::FrameError;
use crate::fs::Instance;

/// Encode one message as a frame.
pub fn encode_frame<M: Message>(msg: &M) -> Result<Vec<u8>, FrameError> {
    let len = msg.encoded_len();
    if len > MAX_FRAME_LEN {
        return Err(FrameError::TooLarge(len));
    }
    let mut buf = Vec::with_capacity(FRAME_HEADER_LEN + len);
    buf.extend_from_slice(&(len as u32).to_le_bytes());
    msg.encode_raw(&mut buf);
    Ok(buf)
}

/*──────────────────────────── reader ────────────────────────────────────*/

/// Pulls frames of type `M` out of a byte stream.
pub struct FrameReader<R, M = EventContext> {
    inner: R,
    _msg: PhantomData<fn() -> M>,
}

impl<R: Read, M: Message + Default> FrameReader<R, M> {
    pub fn new(inner: R) -> Self {
        Self { inner, _msg: PhantomData }
    }

    /// Next frame, or `Ok(None)` on a clean end of stream.
    pub fn read_frame(&mut self) -> Result<Option<M>, FrameError> {
        let mut header = [0u8; FRAME_HEADER_LEN];
        let got = read_full(&mut self.inner, &mut header)?;
        if got == 0 {
            return Ok(None);
        }
        if got < FRAME_HEADER_LEN {
            return Err(FrameError::Truncated { expected: FRAME_HEADER_LEN, got });
        }

        let len = u32::from_le_bytes(header) as usize;
        if len > MAX_FRAME_LEN {
            return Err(FrameError::TooLarge(len));
        }
        let mut body = vec![0u8; len];
        let got = read_full(&mut self.inner, &mut body)?;
        if got < len {
            return Err(FrameError::Truncated { expected: len, got });
        }
        Ok(Some(M::decode(body.as_slice())?))
    }
}

impl<R: Read, M: Message + Default> Iterator for FrameReader<R, M> {
    type Item = Result<M, FrameError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_frame().transpose()
    }
}

/// Like `read_exact`, but reports how much was read before EOF.
fn read_full<R: Read>(r: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match r.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/*──────────────────────────── writer ────────────────────────────────────*/

/// Appends frames to a byte stream; shareable between dispatch workers.
pub struct FrameWriter<W> {
    inner: Mutex<W>,
}

impl<W: Write> FrameWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner: Mutex::new(inner) }
    }

    pub fn write_frame<M: Message>(&self, msg: &M) -> Result<(), FrameError> {
        let frame = encode_frame(msg)?;
        let mut w = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        w.write_all(&frame)?;
        Ok(())
    }

    pub fn flush(&self) -> Result<(), FrameError> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.inner.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<W: Write + Send> EventSink for FrameWriter<W> {
    fn send_event_information(&self, info: &EventInformation, _instance: Option<&Instance>) {
        if let Err(e) = self.write_frame(info) {
            log::error!("response {} not written: {}", info.serial_number, e);
        }
    }
}
