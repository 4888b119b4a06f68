use crate::error::DecodeError;

/// Outcome of one [`Decoder::decode`](crate::Decoder::decode) call.
///
/// ```text
///   Done(value)   ← a value is complete; the decoder reset itself
///   Processing    ← input ran out first; progress is kept for the next call
///   Error(cause)  ← malformed data; the decoder must be reset before reuse
/// ```
///
/// `Processing` and `Error` carry no value, so a composite decoder can hand
/// a child's state to its own caller with [`cast`](Self::cast) instead of
/// building a new one. The error inside is moved, never re-wrapped.
#[derive(Debug)]
#[must_use]
pub enum State<T> {
    Done(T),
    Processing,
    Error(DecodeError),
}

impl<T> State<T> {
    /// Build an error state from a free-form message.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error(DecodeError::message(message))
    }

    #[must_use]
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done(_))
    }

    #[must_use]
    pub fn is_processing(&self) -> bool {
        matches!(self, Self::Processing)
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    /// Transform the value of a `Done` state.
    pub fn map<R>(self, f: impl FnOnce(T) -> R) -> State<R> {
        self.and_then(|value| State::Done(f(value)))
    }

    /// Replace a `Done` state by the state computed from its value.
    pub fn and_then<R>(self, f: impl FnOnce(T) -> State<R>) -> State<R> {
        match self {
            Self::Done(value) => f(value),
            other => other.cast(),
        }
    }

    /// Change the value type of a `Processing` or `Error` state.
    ///
    /// # Panics
    ///
    /// Panics when called on a `Done` state: there is no value of the target
    /// type to carry over.
    pub fn cast<R>(self) -> State<R> {
        match self {
            Self::Processing => State::Processing,
            Self::Error(error) => State::Error(error),
            Self::Done(_) => panic!("cannot change the value type of a Done state"),
        }
    }

    /// Take the value out of a `Done` state.
    ///
    /// # Errors
    ///
    /// - [`DecodeError::MissingBytes`] for `Processing`.
    /// - The wrapped error, unchanged, for `Error`.
    pub fn get(self) -> Result<T, DecodeError> {
        match self {
            Self::Done(value) => Ok(value),
            Self::Processing => Err(DecodeError::MissingBytes),
            Self::Error(error) => Err(error),
        }
    }

    #[must_use]
    pub fn ok(self) -> Option<T> {
        match self {
            Self::Done(value) => Some(value),
            _ => None,
        }
    }

    pub fn unwrap_or(self, default: T) -> T {
        self.ok().unwrap_or(default)
    }

    pub fn unwrap_or_else(self, default: impl FnOnce() -> T) -> T {
        self.ok().unwrap_or_else(default)
    }

    /// Run `f` on the value of a `Done` state, passing the state through.
    pub fn if_done(self, f: impl FnOnce(&T)) -> Self {
        if let Self::Done(value) = &self {
            f(value);
        }
        self
    }

    /// Run `f` on the cause of an `Error` state, passing the state through.
    pub fn if_error(self, f: impl FnOnce(&DecodeError)) -> Self {
        if let Self::Error(error) = &self {
            f(error);
        }
        self
    }
}

impl<T: PartialEq> PartialEq for State<T> {
    /// Two `Error` states compare by their rendered message, since
    /// [`DecodeError`] holds values (I/O errors, boxed causes) that have no
    /// equality of their own.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Done(a), Self::Done(b)) => a == b,
            (Self::Processing, Self::Processing) => true,
            (Self::Error(a), Self::Error(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}

impl<T> From<Result<T, DecodeError>> for State<T> {
    fn from(result: Result<T, DecodeError>) -> Self {
        match result {
            Ok(value) => Self::Done(value),
            Err(error) => Self::Error(error),
        }
    }
}
