//! Markdown report generator.

use rust_decimal::Decimal;
use std::fmt::Write;

use crate::runner::BacktestResult;

pub struct MarkdownReportGenerator;

impl MarkdownReportGenerator {
    pub fn generate(&self, result: &BacktestResult) -> String {
        let m = &result.metrics;
        let period = match (result.start_date, result.end_date) {
            (Some(start), Some(end)) => format!("{start} → {end}"),
            _ => "no sessions".to_string(),
        };
        let mut report = format!(
            "# IntraLab Run Report\n\n\
Period: {}\n\
Config hash: `{}`\n\
Dataset hash: `{}`\n",
            period, result.config_hash, result.dataset_hash
        );
        if result.has_synthetic {
            report.push_str("\n> **Synthetic data.** Results do not reflect market history.\n");
        }

        let _ = write!(
            report,
            "\n## Summary\n\
- Initial Capital: {:.2}\n\
- Final Capital: {:.2}\n\
- Total Return: {:+.2}%\n\
- Win Rate: {:.1}%\n\
- Max Drawdown: {:+.2}%\n\
- Sharpe: {:.2}\n\
- Profit Factor: {:.2}\n\
- Trades: {} ({} long, {} short)\n",
            result.initial_capital,
            result.final_capital,
            m.total_return * 100.0,
            m.win_rate * 100.0,
            m.max_drawdown * 100.0,
            m.sharpe,
            m.profit_factor,
            m.trade_count,
            m.long_count,
            m.short_count,
        );

        report.push_str("\n## Exit Reasons\n");
        report.push_str("| Reason | Trades |\n|--------|--------|\n");
        for (reason, count) in &m.exit_reasons {
            let _ = writeln!(report, "| {reason} | {count} |");
        }

        let s = &result.stats;
        let _ = write!(
            report,
            "\n## Signals\n\
- Coarse bars evaluated: {}\n\
- Skipped while in a position: {}\n\
- Skipped during warm-up: {}\n\
- Intents: {} ({} filled, {} expired)\n\
- Short intents dropped on empty lookback: {}\n",
            s.coarse_bars, s.busy, s.warmup, s.intents, s.fills, s.expired, s.empty_lookback,
        );

        if !result.days.is_empty() {
            report.push_str("\n## Days\n");
            report.push_str("| Date | Start | End | PnL | Trades |\n");
            report.push_str("|------|-------|-----|-----|--------|\n");
            for day in &result.days {
                let _ = writeln!(
                    report,
                    "| {} | {:.2} | {:.2} | {:+.2} | {} |",
                    day.date, day.start_capital, day.end_capital, day.pnl, day.trade_count
                );
            }
        }

        if !result.failures.is_empty() {
            report.push_str("\n## Skipped Days\n");
            for failure in &result.failures {
                let _ = writeln!(report, "- {}: {}", failure.date, failure.reason);
            }
        }

        if result.trades.is_empty() {
            report.push_str("\nNo trades were generated during the backtest period.\n");
            return report;
        }

        // Trade tape section (top 5 winners and losers)
        let mut sorted_trades: Vec<_> = result.trades.iter().collect();
        sorted_trades.sort_by(|a, b| b.pnl.cmp(&a.pnl));

        report.push_str("\n## Trade Tape\n\n### Top Winners\n");
        report.push_str("| Stock | Direction | Entry | Exit | Exit Type | PnL | Return |\n");
        report.push_str("|-------|-----------|-------|------|-----------|-----|--------|\n");
        for trade in sorted_trades.iter().take(5).filter(|t| t.pnl > Decimal::ZERO) {
            let _ = writeln!(
                report,
                "| {} | {} | {} | {} | {} | {:+.2} | {:+.4}% |",
                trade.symbol,
                trade.direction,
                trade.entry_time,
                trade.exit_time,
                trade.exit_reason,
                trade.pnl,
                trade.return_pct * 100.0
            );
        }

        report.push_str("\n### Top Losers\n");
        report.push_str("| Stock | Direction | Entry | Exit | Exit Type | PnL | Return |\n");
        report.push_str("|-------|-----------|-------|------|-----------|-----|--------|\n");
        for trade in sorted_trades.iter().rev().take(5).filter(|t| t.pnl <= Decimal::ZERO) {
            let _ = writeln!(
                report,
                "| {} | {} | {} | {} | {} | {:+.2} | {:+.4}% |",
                trade.symbol,
                trade.direction,
                trade.entry_time,
                trade.exit_time,
                trade.exit_reason,
                trade.pnl,
                trade.return_pct * 100.0
            );
        }

        report
    }
}
