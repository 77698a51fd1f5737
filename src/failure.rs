//! Failure normalization.
//!
//! Every value that enters a task's failure channel passes through this
//! module. Whatever the caller reports (a message, an error value, a caught
//! panic, or several of those at once) ends up as a [`Failures`]: an ordered,
//! non-empty sequence of [`Failure`] objects.
//!
//! The non-empty, ordered representation exists for the accumulating
//! combinators (`ap`, `all`), which concatenate the failure sequences of
//! their branches in branch order.
//!
//! # Normalization Rules
//!
//! | Reported value | Normalized form |
//! |----------------|-----------------|
//! | `Failure` | one-element sequence |
//! | `Failures` | unchanged |
//! | `&str` / `String` | one `Reported` failure |
//! | error value | one `Error` failure keeping the source |
//! | `Vec<_>` | one failure per element, in order |
//! | empty `Vec` | one `Engine` failure ("empty failure sequence") |
//! | caught panic | one `Panic` failure |

use core::fmt;
use std::any::Any;
use std::error::Error;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use smallvec::SmallVec;

use crate::error::{AggregateFailure, TaskError};

/// Where a failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// A plain message reported by a computation.
    Reported,
    /// An error value reported by a computation or a bridged future.
    Error,
    /// A panic caught inside a computation or a user handler.
    Panic,
    /// A failure produced by the engine itself (step budgets, empty input).
    Engine,
}

impl FailureKind {
    /// Returns the kind name as a static string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Reported => "reported",
            Self::Error => "error",
            Self::Panic => "panic",
            Self::Engine => "engine",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single normalized failure.
///
/// Cloning is cheap: the message and the optional source error are shared.
/// Two failures are equal when their kind and message are equal.
///
/// # Example
///
/// ```
/// use deferred::{Failure, FailureKind};
///
/// let failure = Failure::new("disk full");
/// assert_eq!(failure.kind(), FailureKind::Reported);
/// assert_eq!(failure.message(), "disk full");
/// ```
#[derive(Clone)]
pub struct Failure {
    kind: FailureKind,
    message: Arc<str>,
    source: Option<Arc<dyn Error + Send + Sync + 'static>>,
}

impl Failure {
    /// Creates a `Reported` failure from a message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Reported,
            message: Arc::from(message.into()),
            source: None,
        }
    }

    /// Wraps an error value, keeping it available through [`Failure::downcast_ref`].
    #[must_use]
    pub fn from_error<E>(error: E) -> Self
    where
        E: Error + Send + Sync + 'static,
    {
        Self {
            kind: FailureKind::Error,
            message: Arc::from(error.to_string()),
            source: Some(Arc::new(error)),
        }
    }

    /// Normalizes a caught panic payload.
    #[must_use]
    pub fn from_panic(payload: &(dyn Any + Send)) -> Self {
        let message = payload
            .downcast_ref::<&'static str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "panic with non-string payload".to_string());
        Self {
            kind: FailureKind::Panic,
            message: Arc::from(message),
            source: None,
        }
    }

    pub(crate) fn engine(error: TaskError) -> Self {
        Self {
            kind: FailureKind::Engine,
            message: Arc::from(error.to_string()),
            source: Some(Arc::new(error)),
        }
    }

    /// Returns the failure kind.
    #[must_use]
    pub const fn kind(&self) -> FailureKind {
        self.kind
    }

    /// Returns the failure message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns true if this failure was produced by a caught panic.
    #[must_use]
    pub const fn is_panic(&self) -> bool {
        matches!(self.kind, FailureKind::Panic)
    }

    /// Returns the wrapped error, if any.
    #[must_use]
    pub fn source_error(&self) -> Option<&(dyn Error + Send + Sync + 'static)> {
        self.source.as_deref()
    }

    /// Attempts to view the wrapped error as a concrete type.
    #[must_use]
    pub fn downcast_ref<E: Error + 'static>(&self) -> Option<&E> {
        self.source.as_deref().and_then(|e| e.downcast_ref::<E>())
    }
}

impl fmt::Debug for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Failure")
            .field("kind", &self.kind)
            .field("message", &&*self.message)
            .field("has_source", &self.source.is_some())
            .finish()
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            FailureKind::Panic => write!(f, "panic: {}", self.message),
            _ => f.write_str(&self.message),
        }
    }
}

impl PartialEq for Failure {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.message == other.message
    }
}

impl Eq for Failure {}

impl Error for Failure {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn Error + 'static))
    }
}

impl From<&str> for Failure {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<String> for Failure {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<TaskError> for Failure {
    fn from(error: TaskError) -> Self {
        Self::engine(error)
    }
}

impl From<std::io::Error> for Failure {
    fn from(error: std::io::Error) -> Self {
        Self::from_error(error)
    }
}

impl From<Box<dyn Error + Send + Sync + 'static>> for Failure {
    fn from(error: Box<dyn Error + Send + Sync + 'static>) -> Self {
        Self {
            kind: FailureKind::Error,
            message: Arc::from(error.to_string()),
            source: Some(Arc::from(error)),
        }
    }
}

/// An ordered, non-empty sequence of failures.
///
/// This is the unit of the failure channel. Sequential combinators pass it
/// through untouched; `ap` and `all` concatenate sequences in branch order.
#[derive(Clone, PartialEq, Eq)]
pub struct Failures {
    items: SmallVec<[Failure; 1]>,
}

#[allow(clippy::len_without_is_empty)]
impl Failures {
    /// Creates a one-element sequence.
    #[must_use]
    pub fn single(failure: Failure) -> Self {
        let mut items = SmallVec::new();
        items.push(failure);
        Self { items }
    }

    /// Builds a sequence from a vector, returning `None` when it is empty.
    #[must_use]
    pub fn from_vec(failures: Vec<Failure>) -> Option<Self> {
        if failures.is_empty() {
            None
        } else {
            Some(Self {
                items: SmallVec::from_vec(failures),
            })
        }
    }

    /// Builds a sequence from any iterator of failures.
    ///
    /// An empty iterator normalizes to a single engine failure so the
    /// non-empty invariant always holds.
    #[must_use]
    pub fn normalize<I>(failures: I) -> Self
    where
        I: IntoIterator<Item = Failure>,
    {
        let items: SmallVec<[Failure; 1]> = failures.into_iter().collect();
        if items.is_empty() {
            Self::single(Failure {
                kind: FailureKind::Engine,
                message: Arc::from("empty failure sequence"),
                source: None,
            })
        } else {
            Self { items }
        }
    }

    /// Returns the first failure.
    #[must_use]
    pub fn first(&self) -> &Failure {
        &self.items[0]
    }

    /// Returns the number of failures (always at least one).
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if the sequence holds exactly one failure.
    #[must_use]
    pub fn is_single(&self) -> bool {
        self.items.len() == 1
    }

    /// Iterates over the failures in order.
    pub fn iter(&self) -> std::slice::Iter<'_, Failure> {
        self.items.iter()
    }

    /// Returns the messages of all failures, in order.
    #[must_use]
    pub fn messages(&self) -> Vec<&str> {
        self.items.iter().map(Failure::message).collect()
    }

    /// Appends another sequence after this one.
    pub fn append(&mut self, other: Self) {
        self.items.extend(other.items);
    }

    /// Concatenates two sequences, `self` first.
    #[must_use]
    pub fn concat(mut self, other: Self) -> Self {
        self.append(other);
        self
    }

    /// Converts into a plain vector.
    #[must_use]
    pub fn into_vec(self) -> Vec<Failure> {
        self.items.into_vec()
    }

    pub(crate) fn map_each<F>(self, mut f: F) -> Self
    where
        F: FnMut(Failure) -> Failure,
    {
        Self {
            items: self.items.into_iter().map(&mut f).collect(),
        }
    }
}

impl fmt::Debug for Failures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.items.iter()).finish()
    }
}

impl fmt::Display for Failures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, failure) in self.items.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{failure}")?;
        }
        Ok(())
    }
}

impl From<Failure> for Failures {
    fn from(failure: Failure) -> Self {
        Self::single(failure)
    }
}

impl IntoIterator for Failures {
    type Item = Failure;
    type IntoIter = smallvec::IntoIter<[Failure; 1]>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a> IntoIterator for &'a Failures {
    type Item = &'a Failure;
    type IntoIter = std::slice::Iter<'a, Failure>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// Conversion into the failure channel.
///
/// Implemented for every value a computation may report as a failure.
pub trait IntoFailures {
    /// Normalizes `self` into a non-empty failure sequence.
    fn into_failures(self) -> Failures;
}

impl IntoFailures for Failures {
    fn into_failures(self) -> Failures {
        self
    }
}

impl IntoFailures for Failure {
    fn into_failures(self) -> Failures {
        Failures::single(self)
    }
}

impl IntoFailures for &str {
    fn into_failures(self) -> Failures {
        Failures::single(Failure::new(self))
    }
}

impl IntoFailures for String {
    fn into_failures(self) -> Failures {
        Failures::single(Failure::new(self))
    }
}

impl IntoFailures for TaskError {
    fn into_failures(self) -> Failures {
        Failures::single(Failure::engine(self))
    }
}

impl IntoFailures for AggregateFailure {
    fn into_failures(self) -> Failures {
        AggregateFailure::into_failures(self)
    }
}

impl IntoFailures for std::io::Error {
    fn into_failures(self) -> Failures {
        Failures::single(Failure::from_error(self))
    }
}

impl IntoFailures for Box<dyn Error + Send + Sync + 'static> {
    fn into_failures(self) -> Failures {
        Failures::single(Failure::from(self))
    }
}

impl<T: Into<Failure>> IntoFailures for Vec<T> {
    fn into_failures(self) -> Failures {
        Failures::normalize(self.into_iter().map(Into::into))
    }
}

/// Runs a user handler, normalizing a panic into the failure channel.
pub(crate) fn capture<R>(f: impl FnOnce() -> R) -> Result<R, Failures> {
    panic::catch_unwind(AssertUnwindSafe(f))
        .map_err(|payload| Failures::single(Failure::from_panic(payload.as_ref())))
}
