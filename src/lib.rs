pub mod accounts;
pub mod auth;
pub mod config;
pub mod decimal;
pub mod engine;
pub mod errors;
pub mod ledger;
pub mod query;
pub mod schedule;
pub mod types;

// re-export key types
pub use accounts::AccountService;
pub use auth::{Claims, PasswordHasher, TokenConfig, TokenIssuer};
pub use config::ServicingConfig;
pub use decimal::Money;
pub use engine::LoanEngine;
pub use errors::{AuthError, Result, ServicingError, StorageError};
pub use ledger::{LedgerStore, LedgerTx, MemoryLedger};
pub use schedule::{InstallmentSchedule, ScheduledInstallment};
pub use types::{
    Account, Loan, LoanId, LoanStatus, LoanUpdate, NewAccount, NewLoan, NewRepayment, Repayment,
    RepaymentId, RepaymentStatus, RepaymentUpdate, Role, UserId,
};

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
pub use uuid::Uuid;
