//! Plain-text rendering of the dashboard views.

use anyhow::Result;
use serde_json::json;
use tracing::debug;

use spendboard_core::events::SubscriptionId;
use spendboard_core::models::{Category, Expense, Overview};
use spendboard_core::utils::{format_idr, format_optional, truncate_string};
use spendboard_core::{Channel, Dashboard, DashboardView, Event, EventBus};

/// Width of the bar drawn for the largest category total
const BAR_WIDTH: usize = 24;

/// Log what the stores broadcast while a view loads. Returns the
/// subscriptions so the caller can remove them afterwards.
pub fn report_events(bus: &EventBus) -> Vec<(Channel, SubscriptionId)> {
    [
        Channel::LoadingState,
        Channel::CategoryData,
        Channel::ExpenseData,
        Channel::ResponseData,
    ]
    .into_iter()
    .map(|channel| {
        let id = bus.on(channel, |event| match event {
            Event::LoadingState(true) => eprintln!("Loading..."),
            Event::LoadingState(false) => debug!("Loading finished"),
            Event::CategoryData(list) => debug!(count = list.len(), "Categories received"),
            Event::ExpenseData(list) => debug!(count = list.len(), "Expenses received"),
            Event::ResponseData(overview) => {
                debug!(categories = overview.all_categories.len(), "Overview received")
            }
            _ => {}
        });
        (channel, id)
    })
    .collect()
}

/// Print `view` from the dashboard's current snapshots
pub fn view(view: DashboardView, dashboard: &Dashboard) {
    match view {
        DashboardView::Overview => overview(&dashboard.overview.snapshot()),
        DashboardView::Expenses => expenses(&dashboard.expenses.snapshot()),
        DashboardView::Categories => categories(&dashboard.categories.snapshot()),
    }
}

/// The same snapshots as pretty JSON
pub fn view_json(view: DashboardView, dashboard: &Dashboard) -> Result<String> {
    let value = match view {
        DashboardView::Overview => json!({
            "overview": *dashboard.overview.snapshot(),
            "weeklyComparison": dashboard.overview.snapshot().weekly_comparison(),
        }),
        DashboardView::Expenses => json!({
            "expenses": *dashboard.expenses.snapshot(),
            "categories": *dashboard.categories.snapshot(),
        }),
        DashboardView::Categories => json!({
            "categories": *dashboard.categories.snapshot(),
        }),
    };
    Ok(serde_json::to_string_pretty(&value)?)
}

pub fn categories(categories: &[Category]) {
    if categories.is_empty() {
        println!("No categories yet.");
        return;
    }
    println!("{:<6} {:<24} {}", "ID", "NAME", "ICON");
    for category in categories {
        println!(
            "{:<6} {:<24} {}",
            format_optional(category.id.as_deref(), "-"),
            truncate_string(&category.name, 24),
            category.icon
        );
    }
}

pub fn expenses(expenses: &[Expense]) {
    if expenses.is_empty() {
        println!("No expenses recorded.");
        return;
    }
    println!(
        "{:<18} {:<20} {:>18} {:<16} {}",
        "DATE", "TITLE", "AMOUNT", "CATEGORY", "PAYMENT"
    );
    for expense in expenses {
        println!(
            "{:<18} {:<20} {:>18} {:<16} {}",
            expense.display_date(),
            truncate_string(expense.display_title(), 20),
            expense.display_amount(),
            truncate_string(&expense.category_name, 16),
            format_optional(expense.payment.as_deref(), "-")
        );
    }
    let total: f64 = expenses.iter().filter_map(|e| e.amount).sum();
    println!();
    println!("{} expenses, total {}", expenses.len(), format_idr(total));
}

pub fn overview(overview: &Overview) {
    if overview.is_empty() {
        println!("Nothing to show yet.");
        return;
    }

    println!("Total spent: {}", format_idr(overview.grand_total()));
    if let Some(top) = overview.top_category() {
        println!("Top category: {} ({})", top.category_name, format_idr(top.total));
    }

    if !overview.all_categories.is_empty() {
        println!();
        println!("By category");
        let max = overview
            .all_categories
            .iter()
            .map(|c| c.total)
            .fold(0.0_f64, f64::max);
        for category in &overview.all_categories {
            println!(
                "  {:<20} {:>18} {}",
                truncate_string(&category.category_name, 20),
                format_idr(category.total),
                bar(category.total, max)
            );
        }
    }

    let weeks = overview.weekly_comparison();
    if !weeks.is_empty() {
        println!();
        println!("  {:<12} {:>18} {:>18}", "DAY", "LAST WEEK", "THIS WEEK");
        for day in weeks {
            println!(
                "  {:<12} {:>18} {:>18}",
                day.date,
                format_idr(day.last_week),
                format_idr(day.this_week)
            );
        }
    }
}

fn bar(value: f64, max: f64) -> String {
    if max <= 0.0 || value <= 0.0 {
        return String::new();
    }
    let len = ((value / max) * BAR_WIDTH as f64).round() as usize;
    "#".repeat(len.clamp(1, BAR_WIDTH))
}
