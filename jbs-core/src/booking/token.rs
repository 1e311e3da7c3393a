use std::fmt;

use uuid::Uuid;

use crate::error::{JbsError, JbsResult};

const HYPHENATED_LEN: usize = 36;

/// A manage/cancellation token in canonical UUID text form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ManageToken(Uuid);

impl ManageToken {
    /// Accepts only the 8-4-4-4-12 hyphenated form, any hex case.
    ///
    /// `Uuid::try_parse` also takes the simple, braced and urn forms; those
    /// differ in length from the hyphenated form.
    pub fn parse(s: &str) -> JbsResult<Self> {
        if s.len() != HYPHENATED_LEN {
            return Err(JbsError::InvalidToken);
        }
        Uuid::try_parse(s)
            .map(ManageToken)
            .map_err(|_| JbsError::InvalidToken)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl From<Uuid> for ManageToken {
    fn from(id: Uuid) -> Self {
        ManageToken(id)
    }
}

impl fmt::Display for ManageToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}
