use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;

use crate::decimal::Money;
use crate::errors::{Result, ServicingError};

/// scheduled installment in a repayment schedule
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledInstallment {
    /// 1-based term index
    pub term: u32,
    pub minimum_payment: Money,
    pub due_date: DateTime<Utc>,
}

/// repayment schedule splitting a principal into equal installments
#[derive(Debug, Clone)]
pub struct InstallmentSchedule {
    pub principal: Money,
    pub terms: u32,
    pub start_date: DateTime<Utc>,
    pub installments: Vec<ScheduledInstallment>,
}

impl InstallmentSchedule {
    /// generate the schedule
    ///
    /// The base installment is the principal divided by the term count,
    /// rounded to cents half-up. The final term receives whatever remainder
    /// is left, absorbing all rounding drift so the installments sum to the
    /// principal exactly.
    pub fn generate(
        principal: Money,
        terms: u32,
        start_date: DateTime<Utc>,
        interval_days: u32,
    ) -> Result<Self> {
        if principal.is_zero() || principal.is_negative() {
            return Err(ServicingError::InvalidPrincipal { amount: principal });
        }
        if terms == 0 {
            return Err(ServicingError::InvalidTermCount { terms });
        }

        let base = principal / Decimal::from(terms);
        let mut remainder = principal;
        let mut installments = Vec::with_capacity(terms as usize);

        for term in 1..=terms {
            let minimum_payment = if term == terms {
                remainder
            } else {
                remainder -= base;
                base
            };

            installments.push(ScheduledInstallment {
                term,
                minimum_payment,
                due_date: start_date + Duration::days(i64::from(interval_days) * i64::from(term)),
            });
        }

        Ok(Self {
            principal,
            terms,
            start_date,
            installments,
        })
    }

    /// get the installment for a specific 1-based term
    pub fn installment(&self, term: u32) -> Option<&ScheduledInstallment> {
        term.checked_sub(1)
            .and_then(|index| self.installments.get(index as usize))
    }

    /// sum of all installment amounts
    pub fn total(&self) -> Money {
        self.installments
            .iter()
            .map(|i| i.minimum_payment)
            .fold(Money::ZERO, |acc, x| acc + x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_equal_split_with_remainder_on_last_term() {
        let schedule =
            InstallmentSchedule::generate(Money::from_major(10_000), 3, start(), 7).unwrap();

        assert_eq!(schedule.installments.len(), 3);
        assert_eq!(schedule.installments[0].minimum_payment, Money::from_minor(333333));
        assert_eq!(schedule.installments[1].minimum_payment, Money::from_minor(333333));
        assert_eq!(schedule.installments[2].minimum_payment, Money::from_minor(333334));
    }

    #[test]
    fn test_sum_equals_principal_exactly() {
        for (principal, terms) in [
            (Money::from_major(10_000), 3),
            (Money::from_minor(1), 1),
            (Money::from_minor(100), 3),
            (Money::from_minor(99999), 7),
            (Money::from_decimal(dec!(0.05)), 4),
            (Money::from_major(1_000_000), 52),
        ] {
            let schedule = InstallmentSchedule::generate(principal, terms, start(), 7).unwrap();
            assert_eq!(
                schedule.total(),
                principal,
                "sum drifted for {principal} over {terms} terms"
            );
        }
    }

    #[test]
    fn test_single_term_gets_full_principal() {
        let principal = Money::from_minor(123457);
        let schedule = InstallmentSchedule::generate(principal, 1, start(), 7).unwrap();

        assert_eq!(schedule.installments.len(), 1);
        assert_eq!(schedule.installments[0].minimum_payment, principal);
        assert_eq!(schedule.installments[0].due_date, start() + Duration::days(7));
    }

    #[test]
    fn test_due_dates_strictly_ascending_weekly() {
        let schedule =
            InstallmentSchedule::generate(Money::from_major(5_000), 5, start(), 7).unwrap();

        for pair in schedule.installments.windows(2) {
            assert!(pair[0].due_date < pair[1].due_date);
        }
        assert_eq!(schedule.installments[0].due_date, start() + Duration::days(7));
        assert_eq!(schedule.installments[4].due_date, start() + Duration::days(35));
    }

    #[test]
    fn test_base_rounds_half_up() {
        // 100 / 3 = 33.333.. -> 33.33; last term absorbs 33.34
        let schedule = InstallmentSchedule::generate(Money::from_major(100), 3, start(), 7).unwrap();
        assert_eq!(schedule.installments[0].minimum_payment, Money::from_minor(3333));
        assert_eq!(schedule.installments[2].minimum_payment, Money::from_minor(3334));

        // 10.01 / 2 = 5.005 -> 5.01 half-up; last term gets 5.00
        let schedule =
            InstallmentSchedule::generate(Money::from_minor(1001), 2, start(), 7).unwrap();
        assert_eq!(schedule.installments[0].minimum_payment, Money::from_minor(501));
        assert_eq!(schedule.installments[1].minimum_payment, Money::from_minor(500));
    }

    #[test]
    fn test_invalid_inputs_rejected() {
        assert!(matches!(
            InstallmentSchedule::generate(Money::ZERO, 3, start(), 7),
            Err(ServicingError::InvalidPrincipal { .. })
        ));
        assert!(matches!(
            InstallmentSchedule::generate(Money::from_major(-5), 3, start(), 7),
            Err(ServicingError::InvalidPrincipal { .. })
        ));
        assert!(matches!(
            InstallmentSchedule::generate(Money::from_major(100), 0, start(), 7),
            Err(ServicingError::InvalidTermCount { .. })
        ));
    }

    #[test]
    fn test_installment_lookup_is_one_based() {
        let schedule =
            InstallmentSchedule::generate(Money::from_major(900), 3, start(), 7).unwrap();

        assert!(schedule.installment(0).is_none());
        assert_eq!(schedule.installment(1).unwrap().term, 1);
        assert_eq!(schedule.installment(3).unwrap().term, 3);
        assert!(schedule.installment(4).is_none());
    }
}
