//! loan lifecycle engine
//!
//! Creation, approval, and payment of installment loans over the
//! transactional ledger seam. Payment validation runs against read-only
//! lookups before any write transaction is opened, which keeps lock scope
//! minimal; the storage implementation's isolation governs concurrent
//! payers on the same loan.

use std::sync::Arc;

use hourglass_rs::SafeTimeProvider;
use tracing::info;

use crate::config::ServicingConfig;
use crate::decimal::Money;
use crate::errors::{Result, ServicingError};
use crate::ledger::{rollback_quietly, LedgerStore, LedgerTx};
use crate::schedule::InstallmentSchedule;
use crate::types::{
    LoanId, LoanStatus, LoanUpdate, NewLoan, NewRepayment, Repayment, RepaymentStatus,
    RepaymentUpdate, UserId,
};

/// loan lifecycle engine over a transactional ledger store
pub struct LoanEngine {
    pub(crate) store: Arc<dyn LedgerStore>,
    config: ServicingConfig,
}

impl LoanEngine {
    pub fn new(store: Arc<dyn LedgerStore>, config: ServicingConfig) -> Self {
        Self { store, config }
    }

    /// create a loan and its full repayment schedule in one atomic unit
    ///
    /// Nothing is visible to readers until the commit: a failure at any
    /// step rolls the whole transaction back, so a loan without its
    /// schedule (or a partial schedule) never exists.
    pub async fn create_loan(
        &self,
        amount: Money,
        terms: u32,
        user_id: UserId,
        time: &SafeTimeProvider,
    ) -> Result<LoanId> {
        if amount.is_zero() || amount.is_negative() {
            return Err(ServicingError::InvalidPrincipal { amount });
        }
        if terms == 0 {
            return Err(ServicingError::InvalidTermCount { terms });
        }

        let now = time.now();
        let mut tx = self.store.begin().await?;

        match self.stage_new_loan(&mut *tx, amount, terms, user_id, now).await {
            Ok(loan_id) => match tx.commit().await {
                Ok(()) => {
                    info!(%loan_id, %amount, terms, "loan created");
                    Ok(loan_id)
                }
                Err(err) => {
                    rollback_quietly(&mut *tx).await;
                    Err(err.into())
                }
            },
            Err(err) => {
                rollback_quietly(&mut *tx).await;
                Err(err)
            }
        }
    }

    async fn stage_new_loan(
        &self,
        tx: &mut dyn LedgerTx,
        amount: Money,
        terms: u32,
        user_id: UserId,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Result<LoanId> {
        let loan_id = tx
            .insert_loan(&NewLoan {
                user_id,
                amount,
                status: LoanStatus::Pending,
                created_at: now,
            })
            .await?;
        if loan_id.is_nil() {
            return Err(ServicingError::LoanCreationFailed);
        }

        let schedule = InstallmentSchedule::generate(
            amount,
            terms,
            now,
            self.config.installment_interval_days,
        )?;
        for installment in &schedule.installments {
            let repayment_id = tx
                .insert_repayment(&NewRepayment {
                    loan_id,
                    minimum_payment: installment.minimum_payment,
                    status: RepaymentStatus::Pending,
                    due_date: installment.due_date,
                    created_at: now,
                })
                .await?;
            if repayment_id.is_nil() {
                return Err(ServicingError::RepaymentCreationFailed);
            }
        }

        Ok(loan_id)
    }

    /// force the loan's status to Approved
    ///
    /// The current status is deliberately not validated; the update is
    /// partial and touches no other field.
    pub async fn approve_loan(&self, loan_id: LoanId) -> Result<()> {
        let mut tx = self.store.begin().await?;

        let update = LoanUpdate {
            id: loan_id,
            status: Some(LoanStatus::Approved),
        };
        match tx.update_loan(&update).await {
            Ok(()) => match tx.commit().await {
                Ok(()) => {
                    info!(%loan_id, "loan approved");
                    Ok(())
                }
                Err(err) => {
                    rollback_quietly(&mut *tx).await;
                    Err(err.into())
                }
            },
            Err(err) => {
                rollback_quietly(&mut *tx).await;
                Err(err.into())
            }
        }
    }

    /// apply a payment to the given 1-based term of a loan
    ///
    /// The payer may pay ahead of schedule but never less than what is
    /// cumulatively due through the target term, never against a term whose
    /// predecessors are outstanding, and never past the loan's principal.
    /// A payment that brings the cumulative total to exactly the principal
    /// settles the loan: remaining terms are released as paid-with-zero.
    pub async fn pay_loan(
        &self,
        amount: Money,
        loan_id: LoanId,
        term: u32,
        user_id: UserId,
    ) -> Result<()> {
        let loan = self
            .store
            .loan_by_id_and_user(loan_id, user_id)
            .await?
            .ok_or(ServicingError::LoanNotFound { loan_id })?;

        if loan.status != LoanStatus::Approved {
            return Err(ServicingError::LoanNotApproved {
                status: loan.status,
            });
        }

        let repayments = self.store.repayments_by_loan(loan_id).await?;

        if term == 0 || term as usize > repayments.len() {
            return Err(ServicingError::TermOutOfRange {
                term,
                terms: repayments.len(),
            });
        }
        let target_index = (term - 1) as usize;

        if repayments[..target_index]
            .iter()
            .any(|r| r.status == RepaymentStatus::Pending)
        {
            return Err(ServicingError::PriorTermUnpaid { term });
        }

        if repayments[target_index].status == RepaymentStatus::Paid {
            return Err(ServicingError::AlreadyPaid { term });
        }

        let paid_so_far = repayments
            .iter()
            .filter(|r| r.status == RepaymentStatus::Paid)
            .filter_map(|r| r.actual_payment)
            .fold(Money::ZERO, |acc, x| acc + x);

        let minimum_through_term = repayments[..=target_index]
            .iter()
            .map(|r| r.minimum_payment)
            .fold(Money::ZERO, |acc, x| acc + x);

        if paid_so_far + amount < minimum_through_term {
            return Err(ServicingError::MinimumPaymentNotReached {
                required: minimum_through_term,
                offered: paid_so_far + amount,
            });
        }

        if paid_so_far + amount > loan.amount {
            return Err(ServicingError::OverpaymentRejected {
                offered: amount,
                remaining: loan.amount - paid_so_far,
            });
        }

        let settles_loan = paid_so_far + amount == loan.amount;
        let mut tx = self.store.begin().await?;

        match Self::stage_settlement(&mut *tx, &repayments, target_index, amount, settles_loan)
            .await
        {
            Ok(()) => match tx.commit().await {
                Ok(()) => {
                    if settles_loan {
                        info!(%loan_id, "loan fully settled");
                    } else {
                        info!(%loan_id, term, %amount, "installment paid");
                    }
                    Ok(())
                }
                Err(err) => {
                    rollback_quietly(&mut *tx).await;
                    Err(err.into())
                }
            },
            Err(err) => {
                rollback_quietly(&mut *tx).await;
                Err(err)
            }
        }
    }

    async fn stage_settlement(
        tx: &mut dyn LedgerTx,
        repayments: &[Repayment],
        target_index: usize,
        amount: Money,
        settles_loan: bool,
    ) -> Result<()> {
        if settles_loan {
            tx.update_loan(&LoanUpdate {
                id: repayments[target_index].loan_id,
                status: Some(LoanStatus::Paid),
            })
            .await?;

            // release every outstanding term past the target: the loan is
            // settled, so they are forgiven with an explicit zero payment
            for repayment in repayments[target_index + 1..]
                .iter()
                .filter(|r| r.status == RepaymentStatus::Pending)
            {
                tx.update_repayment(&RepaymentUpdate {
                    id: repayment.id,
                    status: Some(RepaymentStatus::Paid),
                    actual_payment: Some(Money::ZERO),
                })
                .await?;
            }
        }

        tx.update_repayment(&RepaymentUpdate {
            id: repayments[target_index].id,
            status: Some(RepaymentStatus::Paid),
            actual_payment: Some(amount),
        })
        .await?;

        Ok(())
    }
}
