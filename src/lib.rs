pub mod error;
pub mod form;
pub mod loan;
pub mod report;

pub use error::LoanError;
pub use form::{calculate, parse_form, FormError, FormInput};
pub use loan::{
    compute_schedule, AmortizationRow, LoanSpec, Prepayment, PrepaymentStrategy, ScheduleResult,
    AFFORDABILITY_RATIO, MAX_YEARS,
};
pub use report::ReportError;
