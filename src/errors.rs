use thiserror::Error;

use crate::decimal::Money;
use crate::types::{LoanId, LoanStatus};

/// failures surfaced by the ledger store collaborator
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("connection failed: {message}")]
    Connection { message: String },

    #[error("query failed: {message}")]
    Query { message: String },

    #[error("transaction failed: {message}")]
    Transaction { message: String },
}

/// failures surfaced by the auth collaborators
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("invalid token: {message}")]
    InvalidToken { message: String },

    #[error("token expired")]
    TokenExpired,

    #[error("password mismatch")]
    PasswordMismatch,

    #[error("hashing failed: {message}")]
    Hashing { message: String },
}

#[derive(Error, Debug)]
pub enum ServicingError {
    #[error("loan principal must be positive: {amount}")]
    InvalidPrincipal { amount: Money },

    #[error("term count must be at least 1: {terms}")]
    InvalidTermCount { terms: u32 },

    #[error("failed create loan")]
    LoanCreationFailed,

    #[error("failed create repayment")]
    RepaymentCreationFailed,

    #[error("failed create account")]
    AccountCreationFailed,

    #[error("loan not found: {loan_id}")]
    LoanNotFound { loan_id: LoanId },

    #[error("loan not approved: current status is {status:?}")]
    LoanNotApproved { status: LoanStatus },

    #[error("term {term} out of range: schedule has {terms} terms")]
    TermOutOfRange { term: u32, terms: usize },

    #[error("there is a term before that has not been paid")]
    PriorTermUnpaid { term: u32 },

    #[error("already paid for this term")]
    AlreadyPaid { term: u32 },

    #[error("minimum payment not reached: required {required}, offered {offered}")]
    MinimumPaymentNotReached { required: Money, offered: Money },

    #[error("paid more than loan: offered {offered}, remaining {remaining}")]
    OverpaymentRejected { offered: Money, remaining: Money },

    #[error("email not registered")]
    EmailNotRegistered,

    #[error("email already registered")]
    EmailAlreadyRegistered,

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("auth error: {0}")]
    Auth(#[from] AuthError),
}

impl ServicingError {
    /// business-rule violation rather than a collaborator failure; never
    /// worth retrying, always safe to surface verbatim to the caller
    pub fn is_validation(&self) -> bool {
        !matches!(self, ServicingError::Storage(_) | ServicingError::Auth(_))
    }
}

pub type Result<T> = std::result::Result<T, ServicingError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_classification() {
        assert!(ServicingError::LoanNotApproved { status: LoanStatus::Pending }.is_validation());
        assert!(ServicingError::AlreadyPaid { term: 2 }.is_validation());
        assert!(!ServicingError::Storage(StorageError::Query {
            message: "boom".to_string()
        })
        .is_validation());
    }

    #[test]
    fn test_messages_surface_values() {
        let err = ServicingError::MinimumPaymentNotReached {
            required: Money::from_minor(666666),
            offered: Money::from_minor(533333),
        };
        assert_eq!(
            err.to_string(),
            "minimum payment not reached: required 6666.66, offered 5333.33"
        );
    }
}
