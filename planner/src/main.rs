//! CLI entry point for the vrbook cycle planner.

use std::path::PathBuf;
use std::process;

use chrono::Local;
use clap::{Args, Parser, Subcommand};

use vrbook::{band, dollars_to_cents, quota};
use vrbook_planner::config::Config;
use vrbook_planner::error::{Error, Result};
use vrbook_planner::feed::Overrides;
use vrbook_planner::ledger::Ledger;
use vrbook_planner::report;
use vrbook_planner::session::{CycleArgs, PlanOutcome, Session};

#[derive(Parser)]
#[command(name = "vr")]
#[command(about = "Value rebalancing planner: V target, band and order ladders")]
#[command(version)]
struct Cli {
    /// Path to config.toml (defaults are used if it does not exist)
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compute this cycle's plan from the last ledger row
    Plan {
        #[command(flatten)]
        cycle: CycleOpts,

        #[command(flatten)]
        market: MarketOpts,

        /// Do not send the plan to the notification channel
        #[arg(long)]
        no_notify: bool,
    },

    /// Show the opening position for a new account
    Init {
        /// Starting principal in dollars
        #[arg(long)]
        principal: f64,

        #[command(flatten)]
        market: MarketOpts,
    },

    /// Compute the plan and append it to the ledger
    Save {
        #[command(flatten)]
        cycle: CycleOpts,

        #[command(flatten)]
        market: MarketOpts,

        /// Record an opening cycle instead of continuing the ledger
        #[arg(long, requires = "principal")]
        init: bool,

        /// Starting principal in dollars (with --init)
        #[arg(long)]
        principal: Option<f64>,

        /// Skip confirmation prompt
        #[arg(long)]
        force: bool,
    },

    /// Print the ledger and band chart
    History,

    /// Look up the quota table and band recommendation
    Quota {
        /// Reference index drawdown in percent (e.g. -12.5)
        #[arg(long, allow_hyphen_values = true)]
        drawdown: f64,

        /// Sentiment index, 0 = extreme fear
        #[arg(long)]
        sentiment: f64,

        /// Treat the reference index as below its 200-day average
        #[arg(long)]
        downtrend: bool,
    },
}

/// Account inputs for a cycle. Amounts in dollars.
#[derive(Args)]
struct CycleOpts {
    /// Cash deposited this cycle
    #[arg(long, default_value_t = 0.0)]
    deposit: f64,

    /// Actual pool before the deposit (defaults to the last recorded pool)
    #[arg(long)]
    pool: Option<f64>,

    /// Actual shares held (defaults to the last recorded quantity)
    #[arg(long)]
    qty: Option<u64>,
}

/// Manual market inputs; each one replaces the fetched value.
#[derive(Args)]
struct MarketOpts {
    /// Last price in dollars
    #[arg(long)]
    price: Option<f64>,

    /// FX rate (quote currency per dollar)
    #[arg(long)]
    fx: Option<f64>,

    /// Reference index drawdown in percent
    #[arg(long, allow_hyphen_values = true)]
    drawdown: Option<f64>,

    /// Sentiment index, 0 = extreme fear
    #[arg(long)]
    sentiment: Option<f64>,

    #[arg(long, conflicts_with = "downtrend")]
    uptrend: bool,

    #[arg(long)]
    downtrend: bool,
}

impl MarketOpts {
    fn overrides(&self) -> Overrides {
        let is_uptrend = match (self.uptrend, self.downtrend) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        };
        Overrides {
            price: self.price,
            fx_rate: self.fx,
            drawdown_pct: self.drawdown,
            sentiment_index: self.sentiment,
            is_uptrend,
        }
    }
}

impl CycleOpts {
    fn args(&self, market: &MarketOpts) -> CycleArgs {
        CycleArgs {
            deposit_cents: dollars_to_cents(self.deposit),
            pool_cents: self.pool.map(dollars_to_cents),
            quantity: self.qty,
            initial_principal_cents: None,
            overrides: market.overrides(),
        }
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();

    let cli = Cli::parse();

    let config = match Config::load_or_default(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading config: {e}");
            process::exit(1);
        }
    };

    if let Err(e) = run(cli.command, config) {
        match &e {
            Error::Aborted(msg) => {
                eprintln!("\nAborted: {msg}");
                process::exit(2);
            }
            _ => {
                eprintln!("Error: {e}");
                process::exit(1);
            }
        }
    }
}

fn run(command: Command, config: Config) -> Result<()> {
    match command {
        Command::Plan {
            cycle,
            market,
            no_notify,
        } => {
            let mut session = Session::open(config)?;
            let outcome = session.plan(&cycle.args(&market))?;
            print_plan(&session, &outcome);
            if !no_notify {
                session.notify(&outcome);
            }
            Ok(())
        }
        Command::Init { principal, market } => {
            let mut session = Session::open(config)?;
            let args = CycleArgs {
                initial_principal_cents: Some(dollars_to_cents(principal)),
                overrides: market.overrides(),
                ..CycleArgs::default()
            };
            let outcome = session.plan(&args)?;
            print_plan(&session, &outcome);
            println!("\nRun `vr save --init --principal {principal}` to record it.");
            Ok(())
        }
        Command::Save {
            cycle,
            market,
            init,
            principal,
            force,
        } => {
            let mut session = Session::open(config)?;
            let mut args = cycle.args(&market);
            if init {
                args.initial_principal_cents = principal.map(dollars_to_cents);
            }
            let outcome = session.plan(&args)?;
            print_plan(&session, &outcome);

            if !force {
                let confirmed = dialoguer::Confirm::new()
                    .with_prompt(format!(
                        "Append this cycle to {}?",
                        session.config().ledger_path().display()
                    ))
                    .default(false)
                    .interact()
                    .map_err(|e| Error::Aborted(format!("confirmation prompt failed: {e}")))?;

                if !confirmed {
                    println!("Aborted.");
                    return Ok(());
                }
            }

            let record = session.save(&outcome, Local::now().date_naive())?;
            println!(
                "Saved cycle {} (V {}).",
                record.date,
                vrbook::fmt_cents(record.target_value_cents)
            );
            session.notify(&outcome);
            Ok(())
        }
        Command::History => {
            let session = Session::open(config)?;
            let records = session.history()?;
            print!("{}", report::render_history(&records));
            Ok(())
        }
        Command::Quota {
            drawdown,
            sentiment,
            downtrend,
        } => {
            let decision = quota::evaluate(drawdown, sentiment);
            let width = band::recommend_width(drawdown, !downtrend);
            print!("{}", report::render_quota(&decision, width));
            Ok(())
        }
    }
}

fn print_plan<L: Ledger>(session: &Session<L>, outcome: &PlanOutcome) {
    println!("\n{}", report::render_plan(outcome, &session.config().market.ticker));
}
