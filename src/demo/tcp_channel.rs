//! A TCP-backed [`Channel`] using a 4-byte big-endian length prefix,
//! driven by `tokio::task::spawn_local` tasks on the demo server's
//! current-thread runtime.
//!
//! The router itself never touches the network directly: a background read
//! task decodes frames off the socket and feeds them to the router through
//! [`RouterHandle::on_frame_received`], and `send_frame` hands bytes to a
//! background write task through an unbounded channel, reporting completion
//! back through [`RouterHandle::on_frame_sent`]. Both tasks are `spawn_local`
//! because [`RouterHandle`] is an `Rc`-backed, non-`Send` type; this is the
//! concrete embodiment of the single cooperative-executor model the rest of
//! the crate is built around.

#![expect(clippy::big_endian_bytes, reason = "wire format is big-endian")]

use tokio::{
    io::{AsyncReadExt, AsyncWriteExt, ReadHalf, WriteHalf},
    net::TcpStream,
    sync::mpsc,
};
use tracing::warn;

use crate::{
    channel::{Channel, ChannelId},
    router::RouterHandle,
};

/// Maximum accepted frame payload; guards against a peer claiming an
/// unreasonable length prefix and exhausting memory.
const MAX_FRAME_LEN: u32 = 1024 * 1024;

async fn read_frame(reader: &mut ReadHalf<TcpStream>) -> std::io::Result<Vec<u8>> {
    let mut len_buf = [0_u8; 4];
    reader.read_exact(&mut len_buf).await?;
    let len = u32::from_be_bytes(len_buf);
    if len > MAX_FRAME_LEN {
        return Err(std::io::Error::new(std::io::ErrorKind::InvalidData, "frame too large"));
    }
    let mut payload = vec![0_u8; usize::try_from(len).unwrap_or(usize::MAX)];
    reader.read_exact(&mut payload).await?;
    Ok(payload)
}

async fn write_frame(writer: &mut WriteHalf<TcpStream>, frame: &[u8]) -> std::io::Result<()> {
    let len = u32::try_from(frame.len()).unwrap_or(u32::MAX);
    writer.write_all(&len.to_be_bytes()).await?;
    writer.write_all(frame).await
}

/// A connected TCP channel. `connect`/`close` are no-ops here: the socket is
/// already open by the time this is constructed, and close is driven by the
/// read task observing EOF or a write error.
pub struct TcpChannel {
    outbox: mpsc::UnboundedSender<Vec<u8>>,
}

impl TcpChannel {
    /// Wrap an already-connected socket, spawning the read and write tasks.
    /// `router`/`id` let the tasks report events back once the caller has
    /// registered this channel and obtained its [`ChannelId`].
    pub fn spawn(stream: TcpStream, router: RouterHandle, id: ChannelId) -> Self {
        let (mut reader, mut writer) = tokio::io::split(stream);
        let (outbox, mut inbox) = mpsc::unbounded_channel::<Vec<u8>>();

        let read_router = router.clone();
        tokio::task::spawn_local(async move {
            loop {
                match read_frame(&mut reader).await {
                    Ok(bytes) => read_router.on_frame_received(id, &bytes),
                    Err(err) => {
                        warn!(%err, "tcp read error, closing channel");
                        break;
                    }
                }
            }
            read_router.on_channel_closed(id);
        });

        let write_router = router;
        tokio::task::spawn_local(async move {
            while let Some(frame) = inbox.recv().await {
                let ok = write_frame(&mut writer, &frame).await.is_ok();
                write_router.on_frame_sent(id, ok);
                if !ok {
                    break;
                }
            }
        });

        Self { outbox }
    }
}

impl Channel for TcpChannel {
    fn connect(&mut self) {}

    fn close(&mut self) {
        // Dropping the sender ends the write task's recv loop; the read
        // task notices EOF once the peer reacts to the socket closing.
    }

    fn send_frame(&mut self, frame: &[u8]) -> bool {
        self.outbox.send(frame.to_vec()).is_ok()
    }

    fn channel_type(&self) -> &str { "tcp" }

    fn is_persistent(&self) -> bool { false }
}
