//! Two-armed result of a finished run

/// The value a sequence settles to: either a success payload or a domain
/// failure.
///
/// Unlike [`std::result::Result`] there is no `unwrap_or`-style shortcut that
/// silently substitutes one arm for the other; callers either transform one
/// arm ([`map`](Outcome::map), [`map_err`](Outcome::map_err)) or handle both
/// ([`fold`](Outcome::fold)).
#[must_use = "an outcome carries either a value or a domain failure"]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Outcome<A, E> {
    Ok(A),
    Err(E),
}

impl<A, E> Outcome<A, E> {
    pub fn map<B>(self, f: impl FnOnce(A) -> B) -> Outcome<B, E> {
        match self {
            Outcome::Ok(value) => Outcome::Ok(f(value)),
            Outcome::Err(error) => Outcome::Err(error),
        }
    }

    pub fn map_err<F>(self, f: impl FnOnce(E) -> F) -> Outcome<A, F> {
        match self {
            Outcome::Ok(value) => Outcome::Ok(value),
            Outcome::Err(error) => Outcome::Err(f(error)),
        }
    }

    /// Consume the outcome, handling both arms
    pub fn fold<R>(self, on_ok: impl FnOnce(A) -> R, on_err: impl FnOnce(E) -> R) -> R {
        match self {
            Outcome::Ok(value) => on_ok(value),
            Outcome::Err(error) => on_err(error),
        }
    }

    pub const fn is_ok(&self) -> bool {
        matches!(self, Outcome::Ok(_))
    }

    pub const fn is_err(&self) -> bool {
        matches!(self, Outcome::Err(_))
    }

    pub fn ok(self) -> Option<A> {
        match self {
            Outcome::Ok(value) => Some(value),
            Outcome::Err(_) => None,
        }
    }

    pub fn err(self) -> Option<E> {
        match self {
            Outcome::Ok(_) => None,
            Outcome::Err(error) => Some(error),
        }
    }

    pub fn as_ref(&self) -> Outcome<&A, &E> {
        match self {
            Outcome::Ok(value) => Outcome::Ok(value),
            Outcome::Err(error) => Outcome::Err(error),
        }
    }

    pub fn into_result(self) -> Result<A, E> {
        self.into()
    }
}

impl<A, E> From<Result<A, E>> for Outcome<A, E> {
    fn from(result: Result<A, E>) -> Self {
        match result {
            Ok(value) => Outcome::Ok(value),
            Err(error) => Outcome::Err(error),
        }
    }
}

impl<A, E> From<Outcome<A, E>> for Result<A, E> {
    fn from(outcome: Outcome<A, E>) -> Self {
        match outcome {
            Outcome::Ok(value) => Ok(value),
            Outcome::Err(error) => Err(error),
        }
    }
}
