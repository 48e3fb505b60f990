use log::{debug, info, trace};
use std::{fmt, str::FromStr};

use crate::error::LoanError;

/// Assumed maximum share of monthly income that may go to the loan payment.
pub const AFFORDABILITY_RATIO: f64 = 0.35;

/// Longest accepted term.
pub const MAX_YEARS: u32 = 100;

/// Half a cent: a balance below this is not worth another payment.
const MIN_BALANCE: f64 = 0.005;

/// Rounding residue tolerated per unit of principal.
const RESIDUE_PER_UNIT: f64 = 1e-11;

/// What happens to the rest of the schedule after a one-time prepayment.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum PrepaymentStrategy {
    /// keep the payment, pay off sooner
    ReduceTerm,
    /// keep the end date, pay less each month
    #[default]
    ReducePayment,
}

impl fmt::Display for PrepaymentStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrepaymentStrategy::ReduceTerm => write!(f, "reduce_term"),
            PrepaymentStrategy::ReducePayment => write!(f, "reduce_payment"),
        }
    }
}

impl FromStr for PrepaymentStrategy {
    type Err = LoanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "reduce_term" => Ok(PrepaymentStrategy::ReduceTerm),
            "reduce_payment" => Ok(PrepaymentStrategy::ReducePayment),
            other => Err(LoanError::invalid(
                "prepay_strategy",
                &format!("unknown strategy '{}'", other),
            )),
        }
    }
}

#[derive(Clone, Copy, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Prepayment {
    pub month: u32,
    pub amount: f64,
    pub strategy: PrepaymentStrategy,
}

impl Prepayment {
    pub fn new(month: u32, amount: f64, strategy: PrepaymentStrategy) -> Self {
        Self {
            month,
            amount,
            strategy,
        }
    }
}

/// A fixed-rate loan repaid monthly over whole years.
#[derive(Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LoanSpec {
    pub principal: f64,
    pub years: u32,
    /// annual rate in percent (i.e., 7.5 for 7.5%)
    pub annual_rate: f64,
    pub prepayment: Option<Prepayment>,
}

impl LoanSpec {
    pub fn new(principal: f64, years: u32, annual_rate: f64) -> Self {
        Self {
            principal,
            years,
            annual_rate,
            prepayment: None,
        }
    }

    pub fn with_prepayment(mut self, prepayment: Prepayment) -> Self {
        self.prepayment = Some(prepayment);
        self
    }

    pub fn validate(&self) -> Result<(), LoanError> {
        if !self.principal.is_finite() || self.principal <= 0. {
            return Err(LoanError::invalid("principal", "must be positive"));
        }
        if self.years == 0 {
            return Err(LoanError::invalid("years", "must be positive"));
        }
        if self.years > MAX_YEARS {
            return Err(LoanError::invalid(
                "years",
                &format!("must not exceed {} years", MAX_YEARS),
            ));
        }
        if !self.annual_rate.is_finite() || self.annual_rate < 0. {
            return Err(LoanError::invalid("annual_rate", "cannot be negative"));
        }
        if let Some(prepayment) = &self.prepayment {
            if prepayment.month == 0 {
                return Err(LoanError::invalid("prepay_month", "must be positive"));
            }
            if !prepayment.amount.is_finite() || prepayment.amount <= 0. {
                return Err(LoanError::invalid("prepay_amount", "must be positive"));
            }
        }
        Ok(())
    }
}

#[derive(Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AmortizationRow {
    pub month: u32,
    /// cash paid this month, prepayment included
    pub payment: f64,
    /// balance reduction this month, prepayment included
    pub principal_component: f64,
    pub interest_component: f64,
    pub remaining_balance: f64,
    /// one-time prepayment folded into this row, 0 if none
    pub prepayment: f64,
}

impl AmortizationRow {
    pub fn new(
        month: u32,
        payment: f64,
        principal_component: f64,
        interest_component: f64,
        remaining_balance: f64,
        prepayment: f64,
    ) -> Self {
        Self {
            month,
            payment,
            principal_component,
            interest_component,
            remaining_balance,
            prepayment,
        }
    }

    /// Principal repaid by the regular installment alone.
    pub fn scheduled_principal(&self) -> f64 {
        self.principal_component - self.prepayment
    }
}

impl fmt::Display for AmortizationRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "pmt number {}, payment {:.2}, principal paid {:.2}, interest paid {:.2}, ending balance {:.2}",
            self.month,
            self.payment,
            self.principal_component,
            self.interest_component,
            self.remaining_balance
        )
    }
}

#[derive(Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScheduleResult {
    pub principal: f64,
    pub annual_rate: f64,
    pub years: u32,
    /// months actually paid, fewer than years * 12 when a prepayment shortens the term
    pub num_payments: u32,
    /// payment fixed at origination, never updated by a prepayment
    pub base_monthly_payment: f64,
    pub total_paid: f64,
    pub overpayment: f64,
    pub income_required: f64,
    pub affordability_ratio: f64,
    pub prepayment_applied: bool,
    pub schedule: Vec<AmortizationRow>,
}

impl ScheduleResult {
    pub fn get_pmt_amount(&self) -> f64 {
        self.base_monthly_payment
    }

    pub fn get_pmt_count(&self) -> usize {
        self.schedule.len()
    }

    pub fn get_pmt_info(&self, &pmt_number: &usize) -> String {
        match self.get_pmt_detail(&pmt_number) {
            Some(pmt) => pmt.to_string(),
            None => "No payment information.".to_string(),
        }
    }

    /// Row for a 1-based payment number.
    pub fn get_pmt_detail(&self, &pmt_number: &usize) -> Option<&AmortizationRow> {
        pmt_number
            .checked_sub(1)
            .and_then(|idx| self.schedule.get(idx))
    }

    pub fn total_interest(&self) -> f64 {
        self.schedule.iter().map(|row| row.interest_component).sum()
    }
}

/// Outcome of recalculating the schedule after a prepayment.
#[derive(Clone, Copy, PartialEq, Debug)]
pub(crate) enum Recalculation {
    /// same payment, this many months still to pay
    Term { remaining_months: u32 },
    /// new payment over the months left in the original schedule
    Payment { payment: f64 },
}

/// Builds the month-by-month schedule for `spec`.
///
/// A configured prepayment is applied after the regular payment of its month,
/// and only when it does not exceed the balance left at that point. Otherwise
/// (or when the loan is already repaid by then) it has no effect.
pub fn compute_schedule(spec: &LoanSpec) -> Result<ScheduleResult, LoanError> {
    spec.validate()?;

    let pmt_count = spec.years * 12;
    let monthly_rate = (spec.annual_rate / 100.) / 12.;
    let pmt_amount = get_pmt_amount(&spec.principal, &monthly_rate, &pmt_count);
    if !pmt_amount.is_finite() {
        return Err(LoanError::invalid("annual_rate", "monthly payment is not finite"));
    }
    let tolerance = (spec.principal * RESIDUE_PER_UNIT).max(MIN_BALANCE);

    let mut schedule: Vec<AmortizationRow> = Vec::with_capacity(pmt_count as usize);
    let mut remaining = spec.principal;
    let mut current_pmt = pmt_amount;
    let mut prepayment_applied = false;

    for month in 1..=pmt_count {
        let interest = if monthly_rate == 0. {
            0.
        } else {
            remaining * monthly_rate
        };

        // the final installment covers exactly what is left
        let mut principal_paid = current_pmt - interest;
        let pmt_actual = if principal_paid > remaining || month == pmt_count {
            principal_paid = remaining;
            principal_paid + interest
        } else {
            current_pmt
        };
        remaining = clamp_balance(remaining - principal_paid, tolerance);

        let mut prepaid = 0.;
        if let Some(prepayment) = spec.prepayment.filter(|p| p.month == month) {
            if remaining >= prepayment.amount {
                remaining = clamp_balance(remaining - prepayment.amount, tolerance);
                prepaid = prepayment.amount;
                prepayment_applied = true;

                match recalculate(
                    prepayment.strategy,
                    remaining,
                    pmt_count - month,
                    monthly_rate,
                    current_pmt,
                ) {
                    Recalculation::Term { remaining_months } => {
                        debug!(
                            "prepayment {:.2} in month {}: term now {} payments",
                            prepaid,
                            month,
                            month.saturating_add(remaining_months)
                        );
                    }
                    Recalculation::Payment { payment } => {
                        debug!(
                            "prepayment {:.2} in month {}: payment {:.2} -> {:.2}",
                            prepaid, month, current_pmt, payment
                        );
                        current_pmt = payment;
                    }
                }
            } else {
                debug!(
                    "prepayment {:.2} in month {} exceeds balance {:.2}, skipped",
                    prepayment.amount, month, remaining
                );
            }
        }

        trace!(
            "pmt # {}, interest {}, principal {}, end bal {}",
            month,
            interest,
            principal_paid,
            remaining
        );

        schedule.push(AmortizationRow::new(
            month,
            pmt_actual + prepaid,
            principal_paid + prepaid,
            interest,
            remaining,
            prepaid,
        ));

        if remaining <= 0. {
            break;
        }
    }

    if let Some(prepayment) = &spec.prepayment {
        if prepayment.month as usize > schedule.len() {
            debug!(
                "prepayment month {} is past payoff at month {}, skipped",
                prepayment.month,
                schedule.len()
            );
        }
    }

    let total_paid: f64 = schedule.iter().map(|row| row.payment).sum();
    let result = ScheduleResult {
        principal: spec.principal,
        annual_rate: spec.annual_rate,
        years: spec.years,
        num_payments: schedule.len() as u32,
        base_monthly_payment: pmt_amount,
        total_paid,
        overpayment: total_paid - spec.principal,
        income_required: pmt_amount / AFFORDABILITY_RATIO,
        affordability_ratio: AFFORDABILITY_RATIO,
        prepayment_applied,
        schedule,
    };

    info!(
        "schedule for {:.2} over {} years at {}%: {} payments, total paid {:.2}",
        result.principal, result.years, result.annual_rate, result.num_payments, result.total_paid
    );

    Ok(result)
}

fn clamp_balance(balance: f64, tolerance: f64) -> f64 {
    if balance < tolerance {
        0.
    } else {
        balance
    }
}

/// Level payment retiring `principal` over `pmt_count` months.
/// Straight-line installment when the rate is zero.
pub(crate) fn get_pmt_amount(
    &principal: &f64,    // amount to repay
    &monthly_rate: &f64, // rate per month as decimal (i.e., 0.005)
    &pmt_count: &u32,    // number of monthly payments
) -> f64 {
    if monthly_rate == 0. {
        return principal / pmt_count as f64;
    }
    // 1 - (1 + r)^-n, finite for any term
    let paid_down = -(-(pmt_count as f64) * monthly_rate.ln_1p()).exp_m1();
    principal * monthly_rate / paid_down
}

/// Months of `payment` needed to retire `balance`, last month possibly partial.
/// `None` when the payment never catches up with the interest.
pub(crate) fn months_to_payoff(&balance: &f64, &monthly_rate: &f64, &payment: &f64) -> Option<u32> {
    if payment <= 0. {
        return None;
    }
    if monthly_rate == 0. {
        return Some((balance / payment).ceil() as u32);
    }
    let ratio = 1. - (balance * monthly_rate) / payment;
    if ratio <= 0. {
        return None;
    }
    let months = -ratio.ln() / (1. + monthly_rate).ln();
    Some(months.ceil() as u32)
}

pub(crate) fn recalculate(
    strategy: PrepaymentStrategy,
    balance: f64,
    months_left: u32,
    monthly_rate: f64,
    current_pmt: f64,
) -> Recalculation {
    match strategy {
        PrepaymentStrategy::ReduceTerm => {
            let remaining_months = if balance <= 0. {
                0
            } else {
                months_to_payoff(&balance, &monthly_rate, &current_pmt).unwrap_or(months_left)
            };
            Recalculation::Term { remaining_months }
        }
        PrepaymentStrategy::ReducePayment => {
            if months_left == 0 {
                debug_assert!(
                    balance <= 0.,
                    "balance {} left with no months remaining",
                    balance
                );
                return Recalculation::Payment { payment: 0. };
            }
            let payment = if balance <= 0. {
                0.
            } else {
                get_pmt_amount(&balance, &monthly_rate, &months_left)
            };
            Recalculation::Payment { payment }
        }
    }
}
