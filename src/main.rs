use amortize::form::{calculate, FormInput};
use amortize::report::{payment_dates, ChartData, Summary, Table};
use amortize::ScheduleResult;
use chrono::NaiveDate;
use clap::Parser;
use log::{error, LevelFilter};
use simple_logger::SimpleLogger;
use std::process;

/// Loan amortization schedule with an optional one-time prepayment
#[derive(Parser, Debug)]
#[command(name = "amortize", version)]
struct Cli {
    /// Property price, i.e. "3 000 000" or "3000000,00"
    #[arg(long)]
    principal: String,

    /// Down payment, subtracted from the price
    #[arg(long, default_value = "")]
    down_payment: String,

    /// Term in whole years
    #[arg(long)]
    years: String,

    /// Annual interest rate in percent
    #[arg(long, default_value = "")]
    rate: String,

    /// Interest-free installment plan, the rate is ignored
    #[arg(long = "installment")]
    is_installment: bool,

    /// Apply the one-time prepayment below
    #[arg(long)]
    prepayment_enabled: bool,

    /// Month (1-based) the prepayment is made in
    #[arg(long, default_value = "")]
    prepay_month: String,

    /// Prepayment amount
    #[arg(long, default_value = "")]
    prepay_amount: String,

    /// reduce_term or reduce_payment
    #[arg(long, default_value = "reduce_payment")]
    prepay_strategy: String,

    /// Date of the first payment, adds a date column to the table
    #[arg(long)]
    first_payment: Option<NaiveDate>,

    /// Print per-month chart series (month,principal,interest) instead of the table
    #[arg(long)]
    chart: bool,

    /// Default log level, RUST_LOG takes precedence
    #[arg(long, default_value = "warn")]
    log_level: LevelFilter,
}

impl Cli {
    fn form_input(&self) -> FormInput {
        FormInput {
            principal: self.principal.clone(),
            down_payment: self.down_payment.clone(),
            years: self.years.clone(),
            rate: self.rate.clone(),
            prepay_month: self.prepay_month.clone(),
            prepay_amount: self.prepay_amount.clone(),
            prepay_strategy: self.prepay_strategy.clone(),
            prepayment_enabled: self.prepayment_enabled,
            is_installment: self.is_installment,
        }
    }
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = SimpleLogger::new().with_level(cli.log_level).env().init() {
        eprintln!("logger setup failed: {}", e);
    }

    let result = match calculate(&cli.form_input()) {
        Ok(result) => result,
        Err(e) => {
            error!("calculation rejected: {:?}", e);
            eprintln!("{}", e);
            process::exit(1);
        }
    };

    print!("{}", Summary(&result));
    println!();

    if cli.chart {
        print_chart(&result);
        return;
    }

    let dates = match cli.first_payment {
        Some(first) => match payment_dates(first, result.schedule.len()) {
            Ok(dates) => Some(dates),
            Err(e) => {
                error!("payment dates rejected: {:?}", e);
                eprintln!("{}", e);
                process::exit(1);
            }
        },
        None => None,
    };
    print!("{}", Table::new(&result, dates.as_deref()));
}

fn print_chart(result: &ScheduleResult) {
    let chart = ChartData::from_schedule(result);
    println!("month,principal,interest");
    for ((month, principal), interest) in chart
        .labels
        .iter()
        .zip(&chart.principal_series)
        .zip(&chart.interest_series)
    {
        println!("{},{:.2},{:.2}", month, principal, interest);
    }
}

// verifies that results can be handed across threads
#[cfg(test)]
fn is_normal<T: Sized + Send + Sync + Unpin>() {}

#[test]
fn normal_types() {
    is_normal::<ScheduleResult>();
    is_normal::<amortize::LoanSpec>();
    is_normal::<amortize::FormError>();
    is_normal::<amortize::ReportError>();
}
