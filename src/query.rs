//! loan queries with concurrent schedule attachment
//!
//! Schedule fetches are independent per loan and I/O-bound, so one task is
//! spawned per loan. Results are tagged with the loan's original index to
//! restore storage order regardless of completion order. The first error
//! observed wins: remaining tasks are aborted and drained, and the caller
//! receives the error rather than a partially attached result.

use std::sync::Arc;

use tokio::task::JoinSet;

use crate::engine::LoanEngine;
use crate::errors::{Result, StorageError};
use crate::types::{Loan, Repayment, UserId};

type FetchResult = (usize, std::result::Result<Vec<Repayment>, StorageError>);

impl LoanEngine {
    /// fetch a user's loans, each with its repayment schedule attached
    ///
    /// Loans come back in storage (insertion) order. Dropping the returned
    /// future aborts any in-flight schedule fetch.
    pub async fn loans_for_user(&self, user_id: UserId) -> Result<Vec<Loan>> {
        let mut loans = self.store.loans_by_user(user_id).await?;

        let mut fetches: JoinSet<FetchResult> = JoinSet::new();
        for (index, loan) in loans.iter().enumerate() {
            let store = Arc::clone(&self.store);
            let loan_id = loan.id;
            fetches.spawn(async move { (index, store.repayments_by_loan(loan_id).await) });
        }

        while let Some(joined) = fetches.join_next().await {
            let (index, fetched) = match joined {
                Ok(pair) => pair,
                Err(err) => {
                    fetches.shutdown().await;
                    return Err(StorageError::Query {
                        message: format!("schedule fetch task failed: {err}"),
                    }
                    .into());
                }
            };

            match fetched {
                Ok(schedule) => loans[index].repayments = Some(schedule),
                Err(err) => {
                    // abort the rest and wait for them before reporting
                    fetches.shutdown().await;
                    return Err(err.into());
                }
            }
        }

        Ok(loans)
    }
}
