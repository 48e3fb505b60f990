use chrono::{Months, NaiveDate};
use std::fmt;
use thiserror::Error;

use crate::loan::ScheduleResult;

/// Parallel per-month series for plotting the split of each installment.
#[derive(Clone, PartialEq, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChartData {
    pub labels: Vec<u32>,
    /// regular principal only, the one-time prepayment is left out
    pub principal_series: Vec<f64>,
    pub interest_series: Vec<f64>,
}

impl ChartData {
    pub fn from_schedule(result: &ScheduleResult) -> Self {
        let mut chart = ChartData::default();
        for row in &result.schedule {
            chart.labels.push(row.month);
            chart.principal_series.push(row.scheduled_principal());
            chart.interest_series.push(row.interest_component);
        }
        chart
    }
}

/// Two decimals with spaces between thousands, i.e. `1 234 567.89`.
pub fn format_money(value: f64) -> String {
    let fixed = format!("{:.2}", value.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
    let sign = if value < 0. { "-" } else { "" };
    format!("{}{}.{}", sign, group_thousands(int_part), frac_part)
}

/// Whole part only (truncated), spaces between thousands.
pub fn format_int_spaced(value: f64) -> String {
    let sign = if value < 0. { "-" } else { "" };
    let whole = format!("{:.0}", value.abs().trunc());
    format!("{}{}", sign, group_thousands(&whole))
}

fn group_thousands(digits: &str) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(' ');
        }
        grouped.push(c);
    }
    grouped
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReportError {
    #[error("{0} does not return a new payment date")]
    DateOutOfRange(NaiveDate),
}

/// `count` monthly payment dates, the first on `first_pmt_date`.
///
/// Days past the end of a shorter month are clamped to its last day, so a loan
/// paid on the 31st is paid on the 28th/29th/30th in those months.
pub fn payment_dates(first_pmt_date: NaiveDate, count: usize) -> Result<Vec<NaiveDate>, ReportError> {
    (0..count)
        .map(|n| {
            u32::try_from(n)
                .ok()
                .and_then(|n| first_pmt_date.checked_add_months(Months::new(n)))
                .ok_or(ReportError::DateOutOfRange(first_pmt_date))
        })
        .collect()
}

/// Headline figures of a schedule, one per line.
pub struct Summary<'a>(pub &'a ScheduleResult);

impl fmt::Display for Summary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let result = self.0;
        writeln!(f, "Loan amount:        {}", format_money(result.principal))?;
        writeln!(f, "Annual rate:        {}%", result.annual_rate)?;
        writeln!(
            f,
            "Term:               {} years ({} payments made)",
            result.years, result.num_payments
        )?;
        writeln!(f, "Monthly payment:    {}", format_money(result.base_monthly_payment))?;
        writeln!(f, "Total paid:         {}", format_money(result.total_paid))?;
        writeln!(f, "Overpayment:        {}", format_money(result.overpayment))?;
        writeln!(
            f,
            "Income required:    {} ({:.0}% of income to payment)",
            format_int_spaced(result.income_required),
            result.affordability_ratio * 100.
        )
    }
}

/// Amortization table, one line per month. A date column is added when
/// `dates` is given; it should hold one date per row, missing ones are left blank.
pub struct Table<'a> {
    result: &'a ScheduleResult,
    dates: Option<&'a [NaiveDate]>,
}

impl<'a> Table<'a> {
    pub fn new(result: &'a ScheduleResult, dates: Option<&'a [NaiveDate]>) -> Self {
        Table { result, dates }
    }
}

impl fmt::Display for Table<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let date_header = if self.dates.is_some() { format!("{:>12}", "Date") } else { String::new() };
        writeln!(
            f,
            "{:>5}{} {:>16} {:>16} {:>16} {:>18}",
            "Month", date_header, "Payment", "Principal", "Interest", "Balance"
        )?;

        for (idx, row) in self.result.schedule.iter().enumerate() {
            let date_col = match self.dates.and_then(|d| d.get(idx)) {
                Some(date) => format!("{:>12}", date.format("%Y-%m-%d").to_string()),
                None if self.dates.is_some() => format!("{:>12}", ""),
                None => String::new(),
            };
            writeln!(
                f,
                "{:>5}{} {:>16} {:>16} {:>16} {:>18}",
                row.month,
                date_col,
                format_money(row.payment),
                format_money(row.principal_component),
                format_money(row.interest_component),
                format_money(row.remaining_balance)
            )?;
        }
        Ok(())
    }
}

pub fn render_summary(result: &ScheduleResult) -> String {
    Summary(result).to_string()
}

pub fn render_table(result: &ScheduleResult, dates: Option<&[NaiveDate]>) -> String {
    Table::new(result, dates).to_string()
}
