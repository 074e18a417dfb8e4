//! Console rendering for plans, ledger history and quota decisions.

use std::fmt::Write;

use vrbook::{fmt_cents, Ladder, QuotaDecision, SnapshotOrigin};

use crate::ledger::CycleRecord;
use crate::session::PlanOutcome;

/// Width of the history chart in characters.
const CHART_WIDTH: usize = 50;

/// Header block: market, regime, account and band.
pub fn render_summary(outcome: &PlanOutcome, ticker: &str) -> String {
    let plan = &outcome.plan;
    let mut out = String::new();

    let _ = writeln!(
        out,
        "{ticker} {}  FX {:.2}  ({} data)",
        plan.snapshot.price, plan.snapshot.fx_rate, outcome.origin
    );
    let _ = writeln!(
        out,
        "Drawdown {:.1}%  sentiment {:.0}  {}",
        plan.snapshot.drawdown_pct,
        plan.snapshot.sentiment_index,
        if plan.snapshot.is_uptrend { "uptrend" } else { "downtrend" }
    );
    let _ = writeln!(
        out,
        "Regime: {}  quota {:.0}%  recommended band ±{:.0}%",
        plan.quota.regime,
        plan.quota.quota_fraction * 100.0,
        plan.recommended_band_width * 100.0
    );
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "V {}  (+{} this cycle)  band {} ~ {}",
        fmt_cents(plan.account.target_value_cents),
        fmt_cents(plan.growth_cents),
        fmt_cents(plan.band.lower_cents),
        fmt_cents(plan.band.upper_cents)
    );
    let _ = writeln!(
        out,
        "Holding {} shares = {} ({})",
        plan.account.quantity,
        fmt_cents(plan.position_value_cents),
        plan.band_position
    );
    let _ = writeln!(
        out,
        "Pool {}  principal {}  total {} (≈ {:.0} in quote currency)",
        fmt_cents(plan.account.pool_cents),
        fmt_cents(plan.account.principal_cents),
        fmt_cents(plan.total_value_cents),
        plan.to_quote_currency(plan.total_value_cents)
    );

    for w in outcome.warnings() {
        let _ = writeln!(out, "WARNING: {w}");
    }
    out
}

/// One ladder as a table: price, order size, shares and pool after fill.
pub fn render_ladder(title: &str, ladder: &Ladder) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{title}:");
    if ladder.is_empty() {
        let _ = writeln!(out, "  (none)");
        return out;
    }
    if let Some(step) = ladder.step_quantity() {
        let _ = writeln!(out, "  {step} shares per rung, limit orders");
    }
    let _ = writeln!(
        out,
        "  {:>3}  {:>10} {:>6} {:>8} {:>14}",
        "#", "Price", "Qty", "Shares", "Pool"
    );
    for (i, rung) in ladder.rungs().iter().enumerate() {
        let _ = writeln!(
            out,
            "  {:>3}  {:>10} {:>6} {:>8} {:>14}",
            i + 1,
            rung.price.to_string(),
            rung.quantity,
            rung.running_quantity,
            fmt_cents(rung.running_pool_cents)
        );
    }
    let _ = writeln!(
        out,
        "  total {} shares, {}",
        ladder.total_quantity(),
        fmt_cents(ladder.total_notional_cents())
    );
    out
}

/// Summary plus both ladders.
pub fn render_plan(outcome: &PlanOutcome, ticker: &str) -> String {
    let mut out = render_summary(outcome, ticker);
    out.push('\n');
    out.push_str(&render_ladder("BUY", &outcome.plan.buy));
    out.push('\n');
    out.push_str(&render_ladder("SELL", &outcome.plan.sell));
    out
}

/// Ledger table followed by an ASCII band chart.
///
/// Each chart row spans the band: `[` and `]` mark the edges, `|` marks V and
/// `*` marks the position value at the recorded price.
pub fn render_history(records: &[CycleRecord]) -> String {
    let mut out = String::new();
    if records.is_empty() {
        let _ = writeln!(out, "Ledger is empty.");
        return out;
    }

    let _ = writeln!(
        out,
        "{:10} {:>6} {:>12} {:>12} {:>12} {:>9} {:>5}",
        "Date", "Qty", "Pool", "V", "Principal", "Price", "Band"
    );
    for r in records {
        let _ = writeln!(
            out,
            "{:10} {:>6} {:>12} {:>12} {:>12} {:>9} {:>4}%",
            r.date.to_string(),
            r.quantity,
            fmt_cents(r.pool_cents),
            fmt_cents(r.target_value_cents),
            fmt_cents(r.principal_cents),
            r.price.to_string(),
            r.band_pct
        );
    }

    let _ = writeln!(out);
    out.push_str(&band_chart(records));
    out
}

fn band_chart(records: &[CycleRecord]) -> String {
    let edges: Vec<(i64, i64, i64, i64)> = records
        .iter()
        .map(|r| {
            let band = vrbook::band::band(r.target_value_cents, f64::from(r.band_pct) / 100.0);
            (
                band.lower_cents,
                r.target_value_cents,
                band.upper_cents,
                r.position_value_cents(),
            )
        })
        .collect();

    let max = edges
        .iter()
        .map(|&(_, _, upper, position)| upper.max(position))
        .max()
        .unwrap_or(0)
        .max(1);
    let col = |cents: i64| -> usize {
        let x = cents.max(0) as f64 / max as f64 * (CHART_WIDTH - 1) as f64;
        (x.round() as usize).min(CHART_WIDTH - 1)
    };

    let mut out = String::new();
    for (r, &(lower, target, upper, position)) in records.iter().zip(&edges) {
        let mut row = vec![' '; CHART_WIDTH];
        let (lo, hi) = (col(lower), col(upper));
        for cell in row.iter_mut().take(hi + 1).skip(lo) {
            *cell = '-';
        }
        row[lo] = '[';
        row[hi] = ']';
        row[col(target)] = '|';
        row[col(position)] = '*';
        let line: String = row.into_iter().collect();
        let _ = writeln!(out, "{} {}", r.date, line.trim_end());
    }
    let _ = writeln!(out, "{:10} 0{:>width$}", "", fmt_cents(max), width = CHART_WIDTH - 1);
    out
}

/// Quota table lookup for the `quota` command.
pub fn render_quota(decision: &QuotaDecision, recommended_band_width: f64) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Regime: {}  buying {}  quota {:.0}%",
        decision.regime,
        if decision.allowed { "allowed" } else { "blocked" },
        decision.quota_fraction * 100.0
    );
    let _ = writeln!(out, "Recommended band ±{:.0}%", recommended_band_width * 100.0);
    if let Some(reason) = decision.blocking_reason() {
        let _ = writeln!(out, "{reason}");
    }
    out
}

/// One-line note on where the market data came from, if it was not fresh.
pub fn origin_note(origin: SnapshotOrigin) -> Option<&'static str> {
    match origin {
        SnapshotOrigin::Live | SnapshotOrigin::Cached => None,
        SnapshotOrigin::Stale => Some("market data is stale (last good snapshot reused)"),
        SnapshotOrigin::Fallback => Some("market data unavailable; fallback values in use"),
    }
}
