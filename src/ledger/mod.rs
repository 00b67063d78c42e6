//! ledger store collaborator interface
//!
//! The engine depends on this transactional seam, never on a concrete
//! database. Multi-row mutations go through a [`LedgerTx`] handle whose
//! staged writes become visible only on commit.

pub mod memory;

use async_trait::async_trait;

use crate::errors::StorageError;
use crate::types::{
    Account, Loan, LoanId, LoanUpdate, NewAccount, NewLoan, NewRepayment, Repayment, RepaymentId,
    RepaymentUpdate, UserId,
};

pub use memory::MemoryLedger;

/// roll back, logging instead of surfacing a rollback failure so the
/// original error keeps propagating
pub(crate) async fn rollback_quietly(tx: &mut dyn LedgerTx) {
    if let Err(err) = tx.rollback().await {
        tracing::warn!(error = %err, "rollback failed after aborted transaction");
    }
}

/// transactional write handle
///
/// Writes are atomic: either `commit` makes all of them visible or none
/// are. `rollback` discards staged writes and is safe to call after a
/// failed commit without raising a second error. Dropping an uncommitted
/// handle is equivalent to rollback, so the handle never outlives its
/// scope holding writes, whichever exit path is taken.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LedgerTx: Send {
    /// insert a loan, returning the identifier assigned by storage
    async fn insert_loan(&mut self, loan: &NewLoan) -> Result<LoanId, StorageError>;

    /// insert a repayment, returning the identifier assigned by storage
    async fn insert_repayment(&mut self, repayment: &NewRepayment)
        -> Result<RepaymentId, StorageError>;

    /// insert an account, returning the identifier assigned by storage
    async fn insert_account(&mut self, account: &NewAccount) -> Result<UserId, StorageError>;

    /// partial update: only `Some` fields are written, absent fields keep
    /// their stored values
    async fn update_loan(&mut self, update: &LoanUpdate) -> Result<(), StorageError>;

    /// partial update with the same semantics as [`LedgerTx::update_loan`]
    async fn update_repayment(&mut self, update: &RepaymentUpdate) -> Result<(), StorageError>;

    async fn commit(&mut self) -> Result<(), StorageError>;

    async fn rollback(&mut self) -> Result<(), StorageError>;
}

/// durable storage for loans, repayments, and accounts
///
/// Reads see committed state only. Serialization of concurrent writers on
/// the same loan is the implementation's responsibility (isolation level or
/// row locking); the engine does not lock in-process.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn LedgerTx>, StorageError>;

    /// fetch a loan owned by the given user; `None` when the pair does not
    /// resolve
    async fn loan_by_id_and_user(
        &self,
        loan_id: LoanId,
        user_id: UserId,
    ) -> Result<Option<Loan>, StorageError>;

    /// all loans for a user, in insertion order
    async fn loans_by_user(&self, user_id: UserId) -> Result<Vec<Loan>, StorageError>;

    /// all repayments for a loan, ordered by due date ascending (term order)
    async fn repayments_by_loan(&self, loan_id: LoanId) -> Result<Vec<Repayment>, StorageError>;

    async fn account_by_email(&self, email: &str) -> Result<Option<Account>, StorageError>;
}
