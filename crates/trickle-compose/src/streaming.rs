use log::{debug, trace};
use tokio::io::{AsyncRead, AsyncReadExt};
use trickle_wire::{BitInput, DecodeError, Decoder, FeedBuffer, State};

/// Size of each read from the underlying reader.
pub const DEFAULT_CHUNK_SIZE: usize = 4096;

/// Asynchronous streaming driver: yields successive values decoded from an
/// `AsyncRead` without ever waiting for more than the current value needs.
///
/// Bytes are read in chunks into a [`FeedBuffer`] that is drained by the
/// decoder between reads, so memory stays at one chunk plus whatever the
/// decoder itself holds for a partial value. Backpressure is natural: the
/// reader is only polled while the caller awaits the next value.
///
/// # Example
///
/// ```rust,no_run
/// use trickle_compose::StreamingDecoder;
/// use trickle_decoders::common::{Endianness, int_decoder};
/// use tokio::io::AsyncRead;
///
/// async fn sum(reader: impl AsyncRead + Unpin) -> i64 {
///     let mut stream = StreamingDecoder::new(reader, int_decoder(Endianness::Big));
///     let mut total = 0;
///     while let Some(value) = stream.next().await.transpose().unwrap() {
///         total += i64::from(value);
///     }
///     total
/// }
/// ```
pub struct StreamingDecoder<R, D> {
    reader: R,
    decoder: D,
    input: BitInput<FeedBuffer>,
    chunk_size: usize,
    /// Bytes consumed so far by the value currently being decoded.
    in_flight: usize,
    eof: bool,
}

impl<R: AsyncRead + Unpin, D: Decoder> StreamingDecoder<R, D> {
    pub fn new(reader: R, decoder: D) -> Self {
        Self::with_chunk_size(reader, decoder, DEFAULT_CHUNK_SIZE)
    }

    /// # Panics
    ///
    /// Panics if `chunk_size` is 0.
    pub fn with_chunk_size(reader: R, decoder: D, chunk_size: usize) -> Self {
        assert!(chunk_size > 0, "chunk size must be positive");
        Self {
            reader,
            decoder,
            input: BitInput::new(FeedBuffer::new(chunk_size)),
            chunk_size,
            in_flight: 0,
            eof: false,
        }
    }

    /// Decode the next value.
    ///
    /// Returns `None` once the reader is exhausted between two values. A
    /// reader closing in the middle of a value yields
    /// [`DecodeError::UnexpectedEof`]. After any error the decoder is reset,
    /// so a later call starts on a fresh value.
    pub async fn next(&mut self) -> Option<Result<D::Output, DecodeError>> {
        loop {
            let buffered = self.input.source().len();
            if buffered > 0 || self.in_flight > 0 {
                let state = self.decoder.decode(&mut self.input);
                self.in_flight += buffered - self.input.source().len();
                match state {
                    State::Done(value) => {
                        trace!("decoded a value from {} bytes", self.in_flight);
                        self.in_flight = 0;
                        return Some(Ok(value));
                    }
                    State::Error(error) => return Some(Err(self.fail(error))),
                    State::Processing => {}
                }
            }

            if self.eof {
                if self.in_flight == 0 && self.input.source().is_empty() {
                    return None;
                }
                let pending = self.in_flight + self.input.source().len();
                return Some(Err(self.fail(DecodeError::UnexpectedEof { pending })));
            }

            if let Err(error) = self.refill().await {
                return Some(Err(self.fail(error)));
            }
        }
    }

    async fn refill(&mut self) -> Result<(), DecodeError> {
        let buffer = self.input.source_mut();
        if buffer.available() == 0 {
            buffer.grow(self.chunk_size);
        }
        let spare = buffer.spare_mut();
        let read = self.reader.read(spare).await?;
        if read == 0 {
            debug!("reader closed");
            self.eof = true;
        } else {
            trace!("read {read} bytes");
            self.input.source_mut().commit(read);
        }
        Ok(())
    }

    fn fail(&mut self, error: DecodeError) -> DecodeError {
        debug!("streaming decode failed: {error}");
        self.decoder.reset();
        self.in_flight = 0;
        error
    }

    /// Recover the reader. Buffered bytes that were not decoded are lost.
    pub fn into_inner(self) -> R {
        self.reader
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DecodingScope, composed_decoder};
    use tokio::io::AsyncWriteExt;
    use trickle_decoders::common::{Endianness, byte_decoder, int_decoder};

    #[tokio::test]
    async fn yields_every_value_then_none() {
        let bytes: &[u8] = &[0, 0, 0, 1, 0, 0, 0, 2, 0, 0, 0, 3];
        let mut stream = StreamingDecoder::with_chunk_size(bytes, int_decoder(Endianness::Big), 5);
        let mut values = Vec::new();
        while let Some(value) = stream.next().await {
            values.push(value.unwrap());
        }
        assert_eq!(values, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn empty_reader_is_a_clean_end() {
        let bytes: &[u8] = &[];
        let mut stream = StreamingDecoder::new(bytes, byte_decoder());
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn truncated_value_is_unexpected_eof() {
        let bytes: &[u8] = &[0, 0, 0, 1, 0, 0];
        let mut stream = StreamingDecoder::new(bytes, int_decoder(Endianness::Big));
        assert_eq!(stream.next().await.unwrap().unwrap(), 1);
        let error = stream.next().await.unwrap().unwrap_err();
        assert!(matches!(error, DecodeError::UnexpectedEof { pending: 2 }));
    }

    #[derive(Clone, Debug, PartialEq)]
    struct Tree {
        value: u8,
        children: Vec<Tree>,
    }

    #[tokio::test]
    async fn composed_values_over_a_trickling_pipe() {
        let (mut tx, rx) = tokio::io::duplex(2);
        let writer = tokio::spawn(async move {
            let bytes = [9, 0, 0, 0, 1, 4, 0, 0, 0, 0, 7, 0, 0, 0, 0];
            for byte in bytes {
                tx.write_all(&[byte]).await.unwrap();
            }
        });

        let decoder = composed_decoder(|scope: &mut DecodingScope<'_, Tree>| {
            Ok(Tree {
                value: scope.byte()?,
                children: scope.self_vec()?,
            })
        });
        let mut stream = StreamingDecoder::with_chunk_size(rx, decoder, 1);
        let first = stream.next().await.unwrap().unwrap();
        assert_eq!(first.value, 9);
        assert_eq!(first.children, vec![Tree { value: 4, children: vec![] }]);
        let second = stream.next().await.unwrap().unwrap();
        assert_eq!(second, Tree { value: 7, children: vec![] });
        writer.await.unwrap();
        assert!(stream.next().await.is_none());
    }
}
