//! Async I/O traits.
//!
//! Local media streams are exposed as boxed [`AsyncRead`] values; this module
//! re-exports the reader/writer traits and extension helpers so bridge crates
//! do not depend on Tokio directly.

pub use tokio::io::{
    empty, AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncSeek, AsyncSeekExt,
    AsyncWrite, AsyncWriteExt, BufReader, BufWriter, Empty, ReadBuf,
};
