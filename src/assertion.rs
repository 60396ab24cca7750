use alloc::format;
use core::fmt::Debug;

use crate::error::VerifyError;

/// Consumes the result of a table operation.
pub trait ResultAssertion<T> {
    /// Checks `actual`, failing with [`VerifyError::UnexpectedResult`] on a
    /// mismatch.
    fn check(&self, actual: &T) -> Result<(), VerifyError>;
}

/// Accepts any result.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoAssertion;

impl<T> ResultAssertion<T> for NoAssertion {
    fn check(&self, _actual: &T) -> Result<(), VerifyError> {
        Ok(())
    }
}

/// Requires the result to equal a fixed value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpectEq<T>(pub T);

impl<T> ResultAssertion<T> for ExpectEq<T>
where
    T: PartialEq + Debug,
{
    fn check(&self, actual: &T) -> Result<(), VerifyError> {
        if self.0 == *actual {
            return Ok(());
        }

        Err(VerifyError::UnexpectedResult {
            expected: format!("{:?}", self.0),
            actual: format!("{actual:?}"),
        })
    }
}
