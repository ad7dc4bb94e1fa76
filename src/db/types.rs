use serde::{Deserialize, Serialize};
use sqlx::Type;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "userrole", rename_all = "lowercase")]
pub(crate) enum UserRole {
    Superadmin,
    Admin,
    Teacher,
    Student,
    Parent,
    Accountant,
}

impl UserRole {
    pub(crate) fn is_admin(self) -> bool {
        matches!(self, Self::Superadmin | Self::Admin)
    }

    pub(crate) fn can_author_tests(self) -> bool {
        matches!(self, Self::Teacher) || self.is_admin()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "attemptstatus", rename_all = "snake_case")]
pub(crate) enum AttemptStatus {
    InProgress,
    Finished,
}

/// Why an attempt was finished; used as the metrics label and in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FinishReason {
    Submitted,
    Cheating,
    Expired,
}

impl FinishReason {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Submitted => "submitted",
            Self::Cheating => "cheating",
            Self::Expired => "expired",
        }
    }
}
