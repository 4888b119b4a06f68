/// Errors surfaced by decoders through [`State::Error`](crate::State::Error),
/// by [`State::get`](crate::State::get), and by fallible constructors.
///
/// Structural data errors (a negative length prefix, a payload that is not
/// valid text) travel up through parent decoders unchanged: a composite
/// decoder never re-wraps the error of one of its children, so the variant a
/// caller inspects at the top is the one produced at the bottom.
///
/// ```text
///   DecodeError
///   ├── MissingBytes         ← get() on a Processing state
///   ├── NegativeLength       ← size prefix decoded to a value < 0
///   ├── LengthOverflow       ← size prefix does not fit in usize
///   ├── VarintTooLong        ← LEB128 prefix longer than 10 bytes
///   ├── InvalidUtf8 / InvalidUtf16 / InvalidAscii
///   ├── InvalidOrdinal       ← enum ordinal out of range
///   ├── UnknownName          ← enum name not in the table
///   ├── MarkerTooLong        ← opt-in limit hit before the end marker
///   ├── EmptyMarker          ← construction: zero-length end marker
///   ├── MarkerTooShort       ← construction: marker shorter than a code unit
///   ├── UnexpectedEof        ← stream closed in the middle of a value
///   ├── Message / Custom     ← raised by user decoders and builders
///   └── Io(std::io::Error)   ← from the underlying async reader
/// ```
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The value was requested from a state that still needs input.
    #[error("not enough bytes to read")]
    MissingBytes,

    /// A size prefix decoded to a negative number.
    #[error("size must be non-negative, but was {length}")]
    NegativeLength { length: i128 },

    /// A size prefix decoded to a number too large for this platform.
    #[error("size {length} does not fit in usize")]
    LengthOverflow { length: i128 },

    /// Varint encoding exceeded 10 bytes without terminating.
    #[error("varint too long: exceeded 10-byte limit")]
    VarintTooLong,

    /// A string payload was not valid UTF-8.
    #[error("invalid UTF-8 payload")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    /// A string payload was not valid UTF-16.
    #[error("invalid UTF-16 payload")]
    InvalidUtf16,

    /// A string payload contained a byte outside the ASCII range.
    #[error("non-ASCII byte {byte:#04X} at offset {offset}")]
    InvalidAscii { byte: u8, offset: usize },

    /// An ordinal did not designate any known variant.
    #[error("invalid ordinal {ordinal} for a table of {count} variants")]
    InvalidOrdinal { ordinal: i64, count: usize },

    /// A name did not designate any known variant.
    #[error("unknown variant name {name:?}")]
    UnknownName { name: String },

    /// The payload grew past the configured limit without the end marker
    /// showing up.
    #[error("end marker not found within {limit} bytes")]
    MarkerTooLong { limit: usize },

    /// An end marker must contain at least one byte.
    #[error("end marker must not be empty")]
    EmptyMarker,

    /// The end marker is shorter than one code unit of the text encoding.
    #[error("end marker must be at least {min} bytes long (got {actual})")]
    MarkerTooShort { min: usize, actual: usize },

    /// The byte stream ended while a value was still being decoded.
    #[error("stream ended with {pending} bytes of an incomplete value")]
    UnexpectedEof { pending: usize },

    /// A free-form error raised by a user decoder or builder.
    #[error("{0}")]
    Message(String),

    /// An arbitrary error raised by a user decoder or builder.
    #[error(transparent)]
    Custom(Box<dyn std::error::Error + Send + Sync>),

    /// I/O error from the reader feeding a streaming decoder.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl DecodeError {
    /// Build a [`DecodeError::Message`] from anything printable.
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }

    /// Wrap an arbitrary error as [`DecodeError::Custom`].
    pub fn custom(error: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Custom(Box::new(error))
    }
}
