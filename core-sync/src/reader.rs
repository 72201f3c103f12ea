//! Stream wrapper enforcing an item's declared size.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use bridge_traits::DynAsyncRead;
use core_async::io::{AsyncRead, ReadBuf};

/// Fails the read when the inner stream yields more or fewer bytes than
/// declared.
///
/// Object stores send the declared size as the content length, so a local
/// file that changed between enumeration and upload would otherwise produce a
/// truncated or rejected object.
pub struct SizeCheckedReader {
    inner: Box<DynAsyncRead>,
    expected: u64,
    read: u64,
}

impl SizeCheckedReader {
    pub fn new(inner: Box<DynAsyncRead>, expected: u64) -> Self {
        Self {
            inner,
            expected,
            read: 0,
        }
    }

    pub fn bytes_read(&self) -> u64 {
        self.read
    }
}

impl AsyncRead for SizeCheckedReader {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let before = buf.filled().len();
        let wants_more = buf.remaining() > 0;

        match Pin::new(&mut self.inner).poll_read(cx, buf) {
            Poll::Ready(Ok(())) => {
                let n = (buf.filled().len() - before) as u64;
                if n == 0 && wants_more && self.read < self.expected {
                    return Poll::Ready(Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        format!(
                            "stream ended after {} of {} bytes",
                            self.read, self.expected
                        ),
                    )));
                }

                if self.read + n > self.expected {
                    // An erroring read must not leave bytes in the caller's buffer.
                    buf.set_filled(before);
                    return Poll::Ready(Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!(
                            "stream is longer than the declared {} bytes",
                            self.expected
                        ),
                    )));
                }
                self.read += n;
                Poll::Ready(Ok(()))
            }
            other => other,
        }
    }
}
