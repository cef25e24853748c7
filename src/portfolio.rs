use crate::advisory::{advise, volatility, Advice, AdvisoryThresholds, Volatility};
use crate::fee::FeeStatus;
use crate::holding::InstrumentKind;
use crate::quotes::QuoteSnapshot;
use crate::store::HoldingsStore;
use crate::valuation::{derive_rows, DerivedRow, ValuationParams};
use comfy_table::{presets::UTF8_FULL, Attribute, Cell, CellAlignment, Color as TColor, ContentArrangement, Table};
use piechart::{Chart, Color};

/// The derived view of the holdings for one refresh cycle.
pub struct Portfolio {
    pub rows: Vec<DerivedRow>,
}

impl Portfolio {
    pub fn new(rows: Vec<DerivedRow>) -> Portfolio {
        Portfolio { rows }
    }

    pub fn derive(store: &HoldingsStore, quotes: &QuoteSnapshot, params: &ValuationParams) -> Portfolio {
        Portfolio::new(derive_rows(store, quotes, params))
    }

    pub fn get_total_value(&self) -> f64 {
        self.rows.iter().map(|r| r.market_value).sum()
    }

    pub fn segment_value(&self, kind: InstrumentKind) -> f64 {
        self.rows
            .iter()
            .filter(|r| r.kind() == kind)
            .map(|r| r.market_value)
            .sum()
    }

    /// Share of the total in `[0, 1]`; an empty portfolio has no shares.
    pub fn segment_share(&self, kind: InstrumentKind) -> f64 {
        let total = self.get_total_value();
        if total > 0.0 {
            self.segment_value(kind) / total
        } else {
            0.0
        }
    }

    /// Estimated move since the last confirmed NAV, independent of cost.
    pub fn daily_estimated_pnl(&self) -> f64 {
        self.rows.iter().map(|r| r.daily_pnl()).sum()
    }

    pub fn daily_estimated_pnl_pct(&self) -> f64 {
        let base: f64 = self.rows.iter().map(|r| r.holding.prior_value()).sum();
        if base > 0.0 {
            self.daily_estimated_pnl() / base * 100.0
        } else {
            0.0
        }
    }

    pub fn get_total_cost(&self) -> f64 {
        self.rows.iter().map(|r| r.holding.total_cost()).sum()
    }

    /// Estimated gain against cost basis.
    pub fn unrealized_pnl(&self) -> f64 {
        self.rows.iter().map(|r| r.unrealized_pnl()).sum()
    }

    // Print the derived rows as a table
    pub fn print(&self, include_sum: bool) {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_width(140);

        table.set_header(vec![
            Cell::new("Fund").add_attribute(Attribute::Bold),
            Cell::new("Kind").add_attribute(Attribute::Bold),
            Cell::new("Proxy").add_attribute(Attribute::Bold),
            Cell::new("%Proxy").add_attribute(Attribute::Bold),
            Cell::new("Prior NAV").add_attribute(Attribute::Bold),
            Cell::new("Est NAV").add_attribute(Attribute::Bold),
            Cell::new("Value").add_attribute(Attribute::Bold),
            Cell::new("%PnL").add_attribute(Attribute::Bold),
            Cell::new("Days").add_attribute(Attribute::Bold),
            Cell::new("Fee").add_attribute(Attribute::Bold),
            Cell::new("Unlock").add_attribute(Attribute::Bold),
        ]);

        for row in &self.rows {
            let kind_color = match row.kind() {
                InstrumentKind::OffExchange => TColor::DarkYellow,
                InstrumentKind::OnExchange => TColor::DarkBlue,
            };
            let fee_color = match row.fee_status {
                FeeStatus::Locked => TColor::Red,
                FeeStatus::Warned => TColor::DarkYellow,
                FeeStatus::Free => TColor::Green,
                FeeStatus::Exempt => TColor::Blue,
            };
            let fee_text = match row.fee_status {
                FeeStatus::Exempt => "exempt".to_string(),
                status => format!("{status} ({:.1}%)", row.fee_rate_pct),
            };

            let name = match row.holding.get_fund_code() {
                Some(code) => format!("{} ({code})", row.holding.get_name()),
                None => row.holding.get_name().to_string(),
            };

            table.add_row(vec![
                Cell::new(name),
                Cell::new(row.kind()).fg(kind_color),
                Cell::new(row.holding.get_proxy_symbol()),
                colorize_pct(row.live_change_pct),
                Cell::new(format!("{:.4}", row.holding.get_prior_nav())).set_alignment(CellAlignment::Right),
                Cell::new(format!("{:.4}", row.estimated_nav)).set_alignment(CellAlignment::Right),
                Cell::new(format!("{:.2}", row.market_value)).set_alignment(CellAlignment::Right),
                colorize_pct(row.estimated_pnl_pct),
                Cell::new(row.holding.get_holding_days()).set_alignment(CellAlignment::Right),
                Cell::new(fee_text).fg(fee_color),
                Cell::new(progress_bar(row.unlock_progress)),
            ]);
        }

        if include_sum {
            let total_cost = self.get_total_cost();
            let total_pnl_pct = if total_cost > 0.0 {
                self.unrealized_pnl() / total_cost * 100.0
            } else {
                0.0
            };
            table.add_row(vec![
                Cell::new("TOTAL").add_attribute(Attribute::Bold),
                Cell::new(""),
                Cell::new(""),
                colorize_pct(self.daily_estimated_pnl_pct()).add_attribute(Attribute::Bold),
                Cell::new(""),
                Cell::new(""),
                Cell::new(format!("{:.2}", self.get_total_value()))
                    .set_alignment(CellAlignment::Right)
                    .add_attribute(Attribute::Bold),
                colorize_pct(total_pnl_pct).add_attribute(Attribute::Bold),
                Cell::new(""),
                Cell::new(""),
                Cell::new(""),
            ]);
        }

        println!("{table}");
    }

    pub fn print_summary(&self, currency: &str) {
        let mut summary = Table::new();
        summary
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_width(120)
            .set_header(vec![
                Cell::new("Value").add_attribute(Attribute::Bold),
                Cell::new("Off-exchange").add_attribute(Attribute::Bold),
                Cell::new("On-exchange").add_attribute(Attribute::Bold),
                Cell::new("Today").add_attribute(Attribute::Bold),
                Cell::new("%Today").add_attribute(Attribute::Bold),
                Cell::new("PnL vs cost").add_attribute(Attribute::Bold),
            ]);

        summary.add_row(vec![
            Cell::new(format!("{:.2} {currency}", self.get_total_value())).set_alignment(CellAlignment::Right),
            Cell::new(self.segment_label(InstrumentKind::OffExchange)).set_alignment(CellAlignment::Right),
            Cell::new(self.segment_label(InstrumentKind::OnExchange)).set_alignment(CellAlignment::Right),
            colorize_money(self.daily_estimated_pnl()),
            colorize_pct(self.daily_estimated_pnl_pct()),
            colorize_money(self.unrealized_pnl()),
        ]);

        println!("{summary}");
    }

    fn segment_label(&self, kind: InstrumentKind) -> String {
        format!(
            "{:.2} ({:.1}%)",
            self.segment_value(kind),
            self.segment_share(kind) * 100.0
        )
    }

    // Print the segment allocation in descending order %-wise
    pub fn print_allocation(&self) {
        let mut allocation: Vec<(InstrumentKind, f64)> = InstrumentKind::all()
            .into_iter()
            .map(|kind| (kind, self.segment_share(kind) * 100.0))
            .collect();
        allocation.sort_by(|a, b| b.1.total_cmp(&a.1));

        println!("====================================");
        for (kind, percentage) in allocation {
            println!("{: >12} | {percentage: >10.2}", kind.as_str());
        }
    }

    // Slices with a positive value; the chart cannot draw an empty or zero total
    fn pie_data(&self) -> Vec<piechart::Data> {
        let colors = [
            Color::Red,
            Color::Green,
            Color::Blue,
            Color::Yellow,
            Color::Cyan,
            Color::White,
            Color::Purple,
        ];

        self.rows
            .iter()
            .filter(|row| row.market_value > 0.0)
            .enumerate()
            .map(|(i, row)| piechart::Data {
                label: row.holding.get_name().to_string(),
                value: row.market_value as f32,
                color: Some(colors[i % colors.len()].into()),
                fill: '•',
            })
            .collect()
    }

    pub fn draw_pie_chart(&self) {
        let data = self.pie_data();
        if data.is_empty() {
            println!("Nothing to chart: total market value is 0");
            return;
        }

        Chart::new()
            .legend(true)
            .radius(9)
            .aspect_ratio(3)
            .draw(&data);
    }

    /// Advisory and volatility tags per row.
    pub fn advice(&self, thresholds: &AdvisoryThresholds) -> Vec<(&DerivedRow, Advice, Option<Volatility>)> {
        self.rows
            .iter()
            .map(|row| (row, advise(row, thresholds), volatility(row, thresholds)))
            .collect()
    }

    pub fn print_advice(&self, thresholds: &AdvisoryThresholds) {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_width(120)
            .set_header(vec![
                Cell::new("Fund").add_attribute(Attribute::Bold),
                Cell::new("Status").add_attribute(Attribute::Bold),
                Cell::new("Free in").add_attribute(Attribute::Bold),
                Cell::new("%PnL").add_attribute(Attribute::Bold),
                Cell::new("Advice").add_attribute(Attribute::Bold),
                Cell::new("Volatility").add_attribute(Attribute::Bold),
            ]);

        for (row, advice, vol) in self.advice(thresholds) {
            let advice_color = match advice {
                Advice::HardLock => TColor::Red,
                Advice::Underwater => TColor::DarkYellow,
                Advice::Hold => TColor::Green,
            };
            let vol_cell = match vol {
                Some(Volatility::High) => Cell::new(Volatility::High).fg(TColor::Red),
                Some(v) => Cell::new(v),
                None => Cell::new("-"),
            };
            let free_in = if row.days_until_free > 0 {
                format!("{} days", row.days_until_free)
            } else {
                "-".to_string()
            };

            table.add_row(vec![
                Cell::new(row.holding.get_name()),
                Cell::new(row.fee_status),
                Cell::new(free_in).set_alignment(CellAlignment::Right),
                colorize_pct(row.estimated_pnl_pct),
                Cell::new(advice).fg(advice_color),
                vol_cell,
            ]);
        }

        println!("{table}");
    }
}

fn colorize_pct(v: f64) -> Cell {
    let c = if v >= 0.0 { TColor::Green } else { TColor::Red };
    Cell::new(format!("{v:.2}%")).set_alignment(CellAlignment::Right).fg(c)
}

fn colorize_money(v: f64) -> Cell {
    let c = if v >= 0.0 { TColor::Green } else { TColor::Red };
    Cell::new(format!("{v:.2}")).set_alignment(CellAlignment::Right).fg(c)
}

fn progress_bar(progress: f64) -> String {
    const WIDTH: usize = 10;
    let filled = (progress.clamp(0.0, 1.0) * WIDTH as f64).round() as usize;
    format!("{}{} {:>3.0}%", "█".repeat(filled), "░".repeat(WIDTH - filled), progress * 100.0)
}
