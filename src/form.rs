//! Turns the raw fields of the calculator form into a [`LoanSpec`].
//!
//! Numbers may be typed the way Russian-locale users write them: `1 500 000,50`
//! is read as `1500000.5`. Every rejection carries the message shown to the user.

use log::debug;
use thiserror::Error;

use crate::error::LoanError;
use crate::loan::{compute_schedule, LoanSpec, Prepayment, PrepaymentStrategy, ScheduleResult};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormError {
    #[error("Пожалуйста, введите корректные числовые значения.")]
    InvalidNumber,

    #[error("Стоимость недвижимости должна быть больше 0.")]
    NonPositivePrincipal,

    #[error("Срок в годах должен быть больше 0.")]
    NonPositiveYears,

    #[error("Процентная ставка не может быть отрицательной.")]
    NegativeRate,

    #[error("Первоначальный взнос не может быть отрицательным.")]
    NegativeDownPayment,

    #[error("Первоначальный взнос должен быть меньше стоимости недвижимости.")]
    DownPaymentTooLarge,

    #[error("Месяц досрочного платежа должен быть больше 0.")]
    NonPositivePrepayMonth,

    #[error("Сумма досрочного платежа должна быть больше 0.")]
    NonPositivePrepayAmount,

    #[error("Некорректные данные досрочного погашения.")]
    InvalidPrepayment,

    #[error(transparent)]
    Loan(#[from] LoanError),
}

/// Raw form submission, one field per input of the page.
#[derive(Clone, PartialEq, Debug, Default)]
pub struct FormInput {
    pub principal: String,
    pub down_payment: String,
    pub years: String,
    pub rate: String,
    pub prepay_month: String,
    pub prepay_amount: String,
    pub prepay_strategy: String,
    pub prepayment_enabled: bool,
    pub is_installment: bool,
}

/// Parses and validates the form, then builds the schedule.
pub fn calculate(input: &FormInput) -> Result<ScheduleResult, FormError> {
    let spec = parse_form(input)?;
    Ok(compute_schedule(&spec)?)
}

pub fn parse_form(input: &FormInput) -> Result<LoanSpec, FormError> {
    let principal = parse_number(&input.principal).ok_or(FormError::InvalidNumber)?;
    let years = parse_number(&input.years)
        .map(f64::trunc)
        .ok_or(FormError::InvalidNumber)?;
    let annual_rate = if input.is_installment {
        0.
    } else {
        parse_optional(&input.rate).ok_or(FormError::InvalidNumber)?
    };
    let down_payment = parse_optional(&input.down_payment).ok_or(FormError::InvalidNumber)?;

    if principal <= 0. {
        return Err(FormError::NonPositivePrincipal);
    }
    if years <= 0. {
        return Err(FormError::NonPositiveYears);
    }
    if annual_rate < 0. {
        return Err(FormError::NegativeRate);
    }
    if down_payment < 0. {
        return Err(FormError::NegativeDownPayment);
    }
    if down_payment >= principal {
        return Err(FormError::DownPaymentTooLarge);
    }

    let mut spec = LoanSpec::new(principal - down_payment, years as u32, annual_rate);
    if let Some(prepayment) = parse_prepayment(input)? {
        spec = spec.with_prepayment(prepayment);
    }
    debug!("parsed form into {:?}", spec);
    Ok(spec)
}

// prepayment counts only when the box is ticked and both fields are filled in
fn parse_prepayment(input: &FormInput) -> Result<Option<Prepayment>, FormError> {
    let month_raw = input.prepay_month.trim();
    let amount_raw = input.prepay_amount.trim();
    if !input.prepayment_enabled || month_raw.is_empty() || amount_raw.is_empty() {
        return Ok(None);
    }

    let month = parse_number(month_raw)
        .map(f64::trunc)
        .ok_or(FormError::InvalidPrepayment)?;
    let amount = parse_number(amount_raw).ok_or(FormError::InvalidPrepayment)?;
    let strategy = match input.prepay_strategy.trim() {
        "" => PrepaymentStrategy::default(),
        raw => raw
            .parse::<PrepaymentStrategy>()
            .map_err(|_| FormError::InvalidPrepayment)?,
    };

    if month <= 0. {
        return Err(FormError::NonPositivePrepayMonth);
    }
    if amount <= 0. {
        return Err(FormError::NonPositivePrepayAmount);
    }
    Ok(Some(Prepayment::new(month as u32, amount, strategy)))
}

/// Locale-tolerant number: spaces group thousands, `,` or `.` marks decimals.
pub fn parse_number(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, ' ' | '\u{a0}' | '\u{202f}' | '\t'))
        .map(|c| if c == ',' { '.' } else { c })
        .collect();
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

// empty means zero
fn parse_optional(raw: &str) -> Option<f64> {
    if raw.trim().is_empty() {
        Some(0.)
    } else {
        parse_number(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::{calculate, parse_form, parse_number, FormError, FormInput};
    use crate::error::LoanError;
    use crate::loan::{Prepayment, PrepaymentStrategy};
    use approx::assert_abs_diff_eq;
    use test_log::test;

    fn form(principal: &str, years: &str, rate: &str) -> FormInput {
        FormInput {
            principal: principal.to_string(),
            years: years.to_string(),
            rate: rate.to_string(),
            ..Default::default()
        }
    }

    fn with_prepayment(mut input: FormInput, month: &str, amount: &str, strategy: &str) -> FormInput {
        input.prepayment_enabled = true;
        input.prepay_month = month.to_string();
        input.prepay_amount = amount.to_string();
        input.prepay_strategy = strategy.to_string();
        input
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number("1500000"), Some(1_500_000.));
        assert_eq!(parse_number(" 1 500 000,50 "), Some(1_500_000.5));
        assert_eq!(parse_number("1\u{a0}000\u{202f}000"), Some(1_000_000.));
        assert_eq!(parse_number("7.25"), Some(7.25));
        assert_eq!(parse_number("-3"), Some(-3.));
        assert_eq!(parse_number(""), None);
        assert_eq!(parse_number("abc"), None);
        assert_eq!(parse_number("1,000.5"), None);
        assert_eq!(parse_number("inf"), None);
        assert_eq!(parse_number("NaN"), None);
    }

    #[test]
    fn test_parse_basic_form() {
        let mut input = form("3 000 000", "20", "10,5");
        input.down_payment = "500 000".to_string();

        let spec = parse_form(&input).unwrap();
        assert_eq!(spec.principal, 2_500_000.);
        assert_eq!(spec.years, 20);
        assert_eq!(spec.annual_rate, 10.5);
        assert_eq!(spec.prepayment, None);
    }

    #[test]
    fn test_empty_rate_and_down_payment_default_to_zero() {
        let spec = parse_form(&form("100000", "2.9", "")).unwrap();
        assert_eq!(spec.principal, 100_000.);
        assert_eq!(spec.years, 2);
        assert_eq!(spec.annual_rate, 0.);
    }

    #[test]
    fn test_installment_ignores_rate() {
        let mut input = form("600000", "5", "not a number");
        input.is_installment = true;

        let spec = parse_form(&input).unwrap();
        assert_eq!(spec.annual_rate, 0.);
    }

    #[test]
    fn test_validation_messages() {
        let err = |input: FormInput| parse_form(&input).unwrap_err();

        assert_eq!(err(form("abc", "20", "10")), FormError::InvalidNumber);
        assert_eq!(err(form("", "20", "10")), FormError::InvalidNumber);
        assert_eq!(err(form("100", "x", "10")), FormError::InvalidNumber);
        assert_eq!(err(form("0", "20", "10")), FormError::NonPositivePrincipal);
        assert_eq!(err(form("100", "0.5", "10")), FormError::NonPositiveYears);
        assert_eq!(err(form("100", "20", "-1")), FormError::NegativeRate);

        let mut input = form("100", "20", "10");
        input.down_payment = "-1".to_string();
        assert_eq!(err(input.clone()), FormError::NegativeDownPayment);
        input.down_payment = "100".to_string();
        assert_eq!(err(input), FormError::DownPaymentTooLarge);

        assert_eq!(
            FormError::NonPositivePrincipal.to_string(),
            "Стоимость недвижимости должна быть больше 0."
        );
        assert_eq!(
            FormError::InvalidNumber.to_string(),
            "Пожалуйста, введите корректные числовые значения."
        );
    }

    #[test]
    fn test_prepayment_fields() {
        let input = with_prepayment(form("1 000 000", "20", "10"), "12", "100 000", "reduce_term");
        let spec = parse_form(&input).unwrap();
        assert_eq!(
            spec.prepayment,
            Some(Prepayment::new(12, 100_000., PrepaymentStrategy::ReduceTerm))
        );

        let input = with_prepayment(form("1000000", "20", "10"), "6,0", "5000,5", "");
        let spec = parse_form(&input).unwrap();
        assert_eq!(
            spec.prepayment,
            Some(Prepayment::new(6, 5_000.5, PrepaymentStrategy::ReducePayment))
        );
    }

    #[test]
    fn test_prepayment_needs_checkbox_and_both_fields() {
        let mut input = with_prepayment(form("1000000", "20", "10"), "12", "100000", "reduce_term");
        input.prepayment_enabled = false;
        assert_eq!(parse_form(&input).unwrap().prepayment, None);

        let input = with_prepayment(form("1000000", "20", "10"), "12", "  ", "reduce_term");
        assert_eq!(parse_form(&input).unwrap().prepayment, None);

        let input = with_prepayment(form("1000000", "20", "10"), "", "100000", "reduce_term");
        assert_eq!(parse_form(&input).unwrap().prepayment, None);
    }

    #[test]
    fn test_prepayment_errors() {
        let base = || form("1000000", "20", "10");
        let err = |input: FormInput| parse_form(&input).unwrap_err();

        assert_eq!(
            err(with_prepayment(base(), "twelve", "100", "reduce_term")),
            FormError::InvalidPrepayment
        );
        assert_eq!(
            err(with_prepayment(base(), "12", "100", "shorten")),
            FormError::InvalidPrepayment
        );
        assert_eq!(
            err(with_prepayment(base(), "0", "100", "reduce_term")),
            FormError::NonPositivePrepayMonth
        );
        assert_eq!(
            err(with_prepayment(base(), "3", "-100", "reduce_term")),
            FormError::NonPositivePrepayAmount
        );
    }

    #[test]
    fn test_calculate() {
        let mut input = form("1 200 000", "20", "10");
        input.down_payment = "200 000".to_string();

        let result = calculate(&input).unwrap();
        assert_eq!(result.principal, 1_000_000.);
        assert_eq!(result.num_payments, 240);
        assert_abs_diff_eq!(result.base_monthly_payment, 9650.22, epsilon = 0.005);
    }

    #[test]
    fn test_calculate_surfaces_engine_errors() {
        for years in ["101", "150000000", "1e12"] {
            match calculate(&form("1000", years, "5")) {
                Err(FormError::Loan(LoanError::InvalidInput { field, .. })) => {
                    assert_eq!(field, "years")
                }
                other => panic!("{} years accepted: {:?}", years, other),
            }
        }
        assert!(calculate(&form("1000", "100", "5")).is_ok());
    }
}
