use super::ui;
use crate::core::summary::CategorySummary;
use crate::core::{Dashboard, Period, ProviderError};
use anyhow::Result;
use comfy_table::Cell;
use tracing::warn;

/// Fetches and renders one styled table per category for `period`.
pub async fn run(dashboard: &Dashboard, period: Period) -> Result<()> {
    let pb = ui::new_spinner("Fetching market data...");
    let result = dashboard.summarize(period).await;
    pb.finish_and_clear();

    let summaries = match result {
        Ok(summaries) => summaries,
        Err(ProviderError::Unavailable(reason)) => {
            warn!(%reason, "Provider unreachable; rendering degraded view");
            println!(
                "{}",
                ui::style_text(
                    "Market data is currently unavailable. Please try again later.",
                    ui::StyleType::Error
                )
            );
            return Ok(());
        }
    };

    if summaries.is_empty() {
        println!(
            "No market data available for period '{}'.",
            ui::style_text(period.token(), ui::StyleType::Subtle)
        );
        return Ok(());
    }

    let count = summaries.len();
    for (i, summary) in summaries.iter().enumerate() {
        print_category(summary);
        if i < count - 1 {
            ui::print_separator();
        }
    }
    println!(
        "\nPeriod: {}",
        ui::style_text(period.token(), ui::StyleType::Subtle)
    );

    Ok(())
}

fn print_category(summary: &CategorySummary) {
    println!(
        "\nCategory: {}",
        ui::style_text(&summary.name, ui::StyleType::Title)
    );

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Symbol"),
        ui::header_cell("Name"),
        ui::header_cell("Last"),
        ui::header_cell("Change %"),
        ui::header_cell("Avg Daily % (30d)"),
    ]);

    for row in &summary.rows {
        let change = match row.change_pct {
            Some(change) => ui::signed_pct_cell(change, 2),
            None => ui::na_cell(),
        };
        let avg_return = match row.avg_daily_return_pct {
            Some(avg) => ui::signed_pct_cell(avg, 4),
            None => ui::na_cell(),
        };

        table.add_row(vec![
            Cell::new(&row.symbol),
            Cell::new(&row.name),
            ui::value_cell(format!("{:.2}", row.last_price)),
            change,
            avg_return,
        ]);
    }

    println!("{table}");
}
