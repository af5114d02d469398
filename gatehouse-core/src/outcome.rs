//! Outcome conversion traits.

use crate::error::BoxError;

/// How a chain pass ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The event was consumed by the handler (or an interceptor answering on
    /// its behalf).
    Handled,
    /// The event went through but nothing acted on it.
    Unhandled,
}

impl Outcome {
    /// Returns `true` for [`Outcome::Handled`].
    pub fn is_handled(self) -> bool {
        matches!(self, Outcome::Handled)
    }
}

/// Trait for converting a handler's output into an [`Outcome`].
///
/// # Default Implementations
///
/// - `()` → Handled
/// - `bool` → `true` = Handled, `false` = Unhandled
/// - `Outcome` → As is
/// - `Option<T>` → Delegates to inner `T`, `None` = Unhandled
/// - `Result<T, E>` → Delegates to inner `T` or boxes the error
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not an `IntoOutcome`",
    label = "missing `IntoOutcome` implementation",
    note = "Handler outputs must convert into an `Outcome` through `into_outcome`."
)]
pub trait IntoOutcome {
    /// Convert the output into an outcome or an error.
    fn into_outcome(self) -> Result<Outcome, BoxError>;
}

impl IntoOutcome for () {
    fn into_outcome(self) -> Result<Outcome, BoxError> {
        Ok(Outcome::Handled)
    }
}

impl IntoOutcome for bool {
    fn into_outcome(self) -> Result<Outcome, BoxError> {
        Ok(if self {
            Outcome::Handled
        } else {
            Outcome::Unhandled
        })
    }
}

impl IntoOutcome for Outcome {
    fn into_outcome(self) -> Result<Outcome, BoxError> {
        Ok(self)
    }
}

impl<T: IntoOutcome> IntoOutcome for Option<T> {
    fn into_outcome(self) -> Result<Outcome, BoxError> {
        match self {
            Some(t) => t.into_outcome(),
            None => Ok(Outcome::Unhandled),
        }
    }
}

impl<T, E> IntoOutcome for Result<T, E>
where
    T: IntoOutcome,
    E: Into<BoxError>,
{
    fn into_outcome(self) -> Result<Outcome, BoxError> {
        match self {
            Ok(t) => t.into_outcome(),
            Err(e) => Err(e.into()),
        }
    }
}
