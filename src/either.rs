//! Minimal two-variant sum type.
//!
//! The engine only needs to construct either side, ask which side a value
//! is on, and read the payload. By convention `Left` carries failures and
//! `Right` carries successes.

/// A value that is one of two types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Either<L, R> {
    /// The failure side.
    Left(L),
    /// The success side.
    Right(R),
}

impl<L, R> Either<L, R> {
    /// Returns true for `Left`.
    #[must_use]
    pub const fn is_left(&self) -> bool {
        matches!(self, Self::Left(_))
    }

    /// Returns true for `Right`.
    #[must_use]
    pub const fn is_right(&self) -> bool {
        matches!(self, Self::Right(_))
    }

    /// Returns the left payload, if any.
    pub fn left(self) -> Option<L> {
        match self {
            Self::Left(l) => Some(l),
            Self::Right(_) => None,
        }
    }

    /// Returns the right payload, if any.
    pub fn right(self) -> Option<R> {
        match self {
            Self::Left(_) => None,
            Self::Right(r) => Some(r),
        }
    }

    /// Converts into a `Result`, `Right` being `Ok`.
    pub fn into_result(self) -> Result<R, L> {
        match self {
            Self::Left(l) => Err(l),
            Self::Right(r) => Ok(r),
        }
    }
}

impl<L, R> From<Result<R, L>> for Either<L, R> {
    fn from(result: Result<R, L>) -> Self {
        match result {
            Ok(r) => Self::Right(r),
            Err(l) => Self::Left(l),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sides_and_payloads() {
        let right: Either<&str, i32> = Either::Right(3);
        assert!(right.is_right());
        assert_eq!(right.right(), Some(3));
        assert_eq!(right.into_result(), Ok(3));

        let left: Either<&str, i32> = Either::Left("bad");
        assert!(left.is_left());
        assert_eq!(left.left(), Some("bad"));
        assert_eq!(Either::from(Err::<i32, _>("bad")), left);
    }
}
