use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::Money;

/// unique identifier for a loan, assigned by the ledger store on insert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct LoanId(Uuid);

/// unique identifier for a repayment, assigned by the ledger store on insert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct RepaymentId(Uuid);

/// unique identifier for a user account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct UserId(Uuid);

macro_rules! id_impl {
    ($name:ident) => {
        impl $name {
            /// mint a fresh identifier
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// the nil identifier, never assigned to a persisted row
            pub const fn nil() -> Self {
                Self(Uuid::nil())
            }

            pub fn is_nil(&self) -> bool {
                self.0.is_nil()
            }

            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }
    };
}

id_impl!(LoanId);
id_impl!(RepaymentId);
id_impl!(UserId);

/// loan status, progressing Pending -> Approved -> Paid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoanStatus {
    /// created, awaiting administrative approval
    Pending,
    /// approved and payable
    Approved,
    /// principal fully settled
    Paid,
}

/// repayment status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RepaymentStatus {
    Pending,
    Paid,
}

/// account role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Admin,
    Customer,
}

/// a principal amount owed by a user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Loan {
    pub id: LoanId,
    pub user_id: UserId,
    /// total principal, fixed at creation
    pub amount: Money,
    pub status: LoanStatus,
    pub created_at: DateTime<Utc>,
    /// attached by the query service; absent on bare reads
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repayments: Option<Vec<Repayment>>,
}

/// one scheduled portion of a loan's principal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Repayment {
    pub id: RepaymentId,
    pub loan_id: LoanId,
    /// required amount for this term, fixed at schedule creation
    pub minimum_payment: Money,
    /// amount applied when the term was settled or released; absent until then
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_payment: Option<Money>,
    pub status: RepaymentStatus,
    pub due_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// a registered user account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: UserId,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// insert record for a loan
#[derive(Debug, Clone, PartialEq)]
pub struct NewLoan {
    pub user_id: UserId,
    pub amount: Money,
    pub status: LoanStatus,
    pub created_at: DateTime<Utc>,
}

/// insert record for a repayment
#[derive(Debug, Clone, PartialEq)]
pub struct NewRepayment {
    pub loan_id: LoanId,
    pub minimum_payment: Money,
    pub status: RepaymentStatus,
    pub due_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// insert record for an account
#[derive(Debug, Clone, PartialEq)]
pub struct NewAccount {
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// partial update of a loan; only `Some` fields are written
#[derive(Debug, Clone, PartialEq)]
pub struct LoanUpdate {
    pub id: LoanId,
    pub status: Option<LoanStatus>,
}

/// partial update of a repayment; only `Some` fields are written.
/// `actual_payment: Some(Money::ZERO)` records a released term, which is
/// distinct from leaving the field untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct RepaymentUpdate {
    pub id: RepaymentId,
    pub status: Option<RepaymentStatus>,
    pub actual_payment: Option<Money>,
}
