//! in-memory reference implementation of the ledger store
//!
//! Transactions stage their writes and apply them under a single lock on
//! commit, so readers never observe a partially written loan/schedule pair.
//! Fault and latency injection hooks exist for exercising rollback and
//! fan-out behavior in tests.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use tokio::time::{sleep, Duration};

use super::{LedgerStore, LedgerTx};
use crate::errors::StorageError;
use crate::types::{
    Account, Loan, LoanId, LoanUpdate, NewAccount, NewLoan, NewRepayment, Repayment, RepaymentId,
    RepaymentUpdate, UserId,
};

#[derive(Default)]
struct LedgerState {
    loans: Vec<Loan>,
    repayments: Vec<Repayment>,
    accounts: Vec<Account>,
}

#[derive(Default)]
struct FaultPlan {
    /// loans whose repayment fetch fails
    failing_repayment_fetches: HashSet<LoanId>,
    /// countdown until a repayment update inside a transaction fails; one-shot
    repayment_update_failure_in: Option<u32>,
    /// artificial latency per loan for repayment fetches, in milliseconds
    fetch_delays: HashMap<LoanId, u64>,
}

/// in-memory ledger store
#[derive(Default)]
pub struct MemoryLedger {
    state: Arc<Mutex<LedgerState>>,
    faults: Arc<Mutex<FaultPlan>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// make `repayments_by_loan` fail for the given loan
    pub async fn fail_repayment_fetch(&self, loan_id: LoanId) {
        self.faults
            .lock()
            .await
            .failing_repayment_fetches
            .insert(loan_id);
    }

    /// fail the n-th (0-based) subsequent repayment update; one-shot
    pub async fn fail_repayment_update_in(&self, updates: u32) {
        self.faults.lock().await.repayment_update_failure_in = Some(updates);
    }

    /// add latency to `repayments_by_loan` for the given loan
    pub async fn delay_repayment_fetch(&self, loan_id: LoanId, millis: u64) {
        self.faults.lock().await.fetch_delays.insert(loan_id, millis);
    }
}

enum Staged {
    InsertLoan(Loan),
    InsertRepayment(Repayment),
    InsertAccount(Account),
    UpdateLoan(LoanUpdate),
    UpdateRepayment(RepaymentUpdate),
}

struct MemoryTx {
    state: Arc<Mutex<LedgerState>>,
    faults: Arc<Mutex<FaultPlan>>,
    staged: Vec<Staged>,
    closed: bool,
}

impl MemoryTx {
    fn guard_open(&self) -> Result<(), StorageError> {
        if self.closed {
            return Err(StorageError::Transaction {
                message: "transaction already closed".to_string(),
            });
        }
        Ok(())
    }
}

fn apply(state: &mut LedgerState, write: &Staged) -> Result<(), StorageError> {
    match write {
        Staged::InsertLoan(loan) => state.loans.push(loan.clone()),
        Staged::InsertRepayment(repayment) => state.repayments.push(repayment.clone()),
        Staged::InsertAccount(account) => state.accounts.push(account.clone()),
        Staged::UpdateLoan(update) => {
            let loan = state
                .loans
                .iter_mut()
                .find(|l| l.id == update.id)
                .ok_or_else(|| StorageError::Query {
                    message: format!("no loan with id {}", update.id),
                })?;
            if let Some(status) = update.status {
                loan.status = status;
            }
        }
        Staged::UpdateRepayment(update) => {
            let repayment = state
                .repayments
                .iter_mut()
                .find(|r| r.id == update.id)
                .ok_or_else(|| StorageError::Query {
                    message: format!("no repayment with id {}", update.id),
                })?;
            if let Some(status) = update.status {
                repayment.status = status;
            }
            if let Some(actual_payment) = update.actual_payment {
                repayment.actual_payment = Some(actual_payment);
            }
            repayment.updated_at = Utc::now();
        }
    }
    Ok(())
}

#[async_trait]
impl LedgerTx for MemoryTx {
    async fn insert_loan(&mut self, loan: &NewLoan) -> Result<LoanId, StorageError> {
        self.guard_open()?;
        let id = LoanId::new();
        self.staged.push(Staged::InsertLoan(Loan {
            id,
            user_id: loan.user_id,
            amount: loan.amount,
            status: loan.status,
            created_at: loan.created_at,
            repayments: None,
        }));
        Ok(id)
    }

    async fn insert_repayment(
        &mut self,
        repayment: &NewRepayment,
    ) -> Result<RepaymentId, StorageError> {
        self.guard_open()?;
        let id = RepaymentId::new();
        self.staged.push(Staged::InsertRepayment(Repayment {
            id,
            loan_id: repayment.loan_id,
            minimum_payment: repayment.minimum_payment,
            actual_payment: None,
            status: repayment.status,
            due_date: repayment.due_date,
            created_at: repayment.created_at,
            updated_at: repayment.created_at,
        }));
        Ok(id)
    }

    async fn insert_account(&mut self, account: &NewAccount) -> Result<UserId, StorageError> {
        self.guard_open()?;
        let id = UserId::new();
        self.staged.push(Staged::InsertAccount(Account {
            id,
            email: account.email.clone(),
            password_hash: account.password_hash.clone(),
            role: account.role,
            created_at: account.created_at,
        }));
        Ok(id)
    }

    async fn update_loan(&mut self, update: &LoanUpdate) -> Result<(), StorageError> {
        self.guard_open()?;
        self.staged.push(Staged::UpdateLoan(update.clone()));
        Ok(())
    }

    async fn update_repayment(&mut self, update: &RepaymentUpdate) -> Result<(), StorageError> {
        self.guard_open()?;

        let mut faults = self.faults.lock().await;
        if let Some(remaining) = faults.repayment_update_failure_in {
            if remaining == 0 {
                faults.repayment_update_failure_in = None;
                return Err(StorageError::Query {
                    message: "injected repayment update failure".to_string(),
                });
            }
            faults.repayment_update_failure_in = Some(remaining - 1);
        }
        drop(faults);

        self.staged.push(Staged::UpdateRepayment(update.clone()));
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), StorageError> {
        self.guard_open()?;
        self.closed = true;

        let mut state = self.state.lock().await;

        // apply against a scratch copy so a failing write leaves nothing behind
        let mut scratch = LedgerState {
            loans: state.loans.clone(),
            repayments: state.repayments.clone(),
            accounts: state.accounts.clone(),
        };
        for write in &self.staged {
            apply(&mut scratch, write)?;
        }
        *state = scratch;
        self.staged.clear();
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), StorageError> {
        // safe to call repeatedly and after a failed commit
        self.closed = true;
        self.staged.clear();
        Ok(())
    }
}

#[async_trait]
impl LedgerStore for MemoryLedger {
    async fn begin(&self) -> Result<Box<dyn LedgerTx>, StorageError> {
        Ok(Box::new(MemoryTx {
            state: Arc::clone(&self.state),
            faults: Arc::clone(&self.faults),
            staged: Vec::new(),
            closed: false,
        }))
    }

    async fn loan_by_id_and_user(
        &self,
        loan_id: LoanId,
        user_id: UserId,
    ) -> Result<Option<Loan>, StorageError> {
        let state = self.state.lock().await;
        Ok(state
            .loans
            .iter()
            .find(|l| l.id == loan_id && l.user_id == user_id)
            .cloned())
    }

    async fn loans_by_user(&self, user_id: UserId) -> Result<Vec<Loan>, StorageError> {
        let state = self.state.lock().await;
        Ok(state
            .loans
            .iter()
            .filter(|l| l.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn repayments_by_loan(&self, loan_id: LoanId) -> Result<Vec<Repayment>, StorageError> {
        let (delay, failing) = {
            let faults = self.faults.lock().await;
            (
                faults.fetch_delays.get(&loan_id).copied(),
                faults.failing_repayment_fetches.contains(&loan_id),
            )
        };

        if let Some(millis) = delay {
            sleep(Duration::from_millis(millis)).await;
        }
        if failing {
            return Err(StorageError::Query {
                message: format!("injected fetch failure for loan {loan_id}"),
            });
        }

        let state = self.state.lock().await;
        let mut repayments: Vec<Repayment> = state
            .repayments
            .iter()
            .filter(|r| r.loan_id == loan_id)
            .cloned()
            .collect();
        repayments.sort_by_key(|r| r.due_date);
        Ok(repayments)
    }

    async fn account_by_email(&self, email: &str) -> Result<Option<Account>, StorageError> {
        let state = self.state.lock().await;
        Ok(state.accounts.iter().find(|a| a.email == email).cloned())
    }
}
