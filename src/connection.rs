use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_util::codec::{Decoder, Encoder};
use tracing::trace;
use uuid::Uuid;

use crate::codec::{CodecError, RequestCodec};
use crate::config::Config;
use crate::frame::Frame;

/// One client connection: reads requests off the stream and writes replies back.
pub struct Connection<S = TcpStream> {
    pub id: Uuid,
    stream: S,
    codec: RequestCodec,
    // Data is read from the socket into the read buffer. When a request is framed, the
    // corresponding bytes are removed from the buffer.
    buffer: BytesMut,
    write_buffer: BytesMut,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S) -> Connection<S> {
        Connection::with_config(stream, &Config::default())
    }

    pub fn with_config(stream: S, config: &Config) -> Connection<S> {
        Connection {
            id: Uuid::new_v4(),
            stream,
            codec: RequestCodec::new(config.max_request_size),
            buffer: BytesMut::with_capacity(config.read_buffer_capacity),
            write_buffer: BytesMut::new(),
        }
    }

    /// Reads the next complete request.
    ///
    /// Returns `None` when the peer closes the connection between requests. Closing it in the
    /// middle of a request is an error.
    pub async fn read_request(&mut self) -> Result<Option<Vec<String>>, CodecError> {
        loop {
            if let Some(request) = self.codec.decode(&mut self.buffer)? {
                return Ok(Some(request));
            }

            let n = self.stream.read_buf(&mut self.buffer).await?;
            trace!("read {} bytes", n);

            if n == 0 {
                return self.codec.decode_eof(&mut self.buffer);
            }
        }
    }

    /// Writes one complete reply and flushes it to the peer.
    pub async fn write_frame(&mut self, frame: Frame) -> Result<(), CodecError> {
        self.codec.encode(frame, &mut self.write_buffer)?;
        self.stream.write_all(&self.write_buffer).await?;
        self.write_buffer.clear();
        self.stream.flush().await?;
        Ok(())
    }
}
