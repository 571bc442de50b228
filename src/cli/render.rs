//! Plain-text rendering of API records for the terminal.

use anyhow::Result;
use serde::Serialize;
use std::fmt::Write;
use strum::IntoEnumIterator;

use crate::{
    api::scan::PollOutcome,
    protocol::types::{
        AdminStats, AdminUser, CompareResponse, Correction, NutrientField, PaginatedScans,
        PaginatedUsers, Product, Scan, User,
    },
};

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn number(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value:.1}")
    }
}

pub fn scan_line(scan: &Scan) -> String {
    let score = scan
        .nutri_score
        .map(|score| format!("Nutri-Score {score}"))
        .unwrap_or_else(|| "-".to_string());
    format!(
        "{} {:<36} {:<10} {:<14} {} {}",
        scan.status.tone().marker(),
        scan.id,
        scan.status,
        score,
        scan.known_barcode().unwrap_or("-"),
        scan.created_at
    )
}

pub fn scan_detail(scan: &Scan) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Scan {}", scan.id);
    let _ = writeln!(out, "  Status:   {} {}", scan.status.tone().marker(), scan.status);
    if let Some(barcode) = scan.known_barcode() {
        let _ = writeln!(out, "  Barcode:  {barcode}");
    }
    if let Some(score) = scan.nutri_score {
        let value = scan
            .nutri_score_value
            .map(|v| format!(" ({})", number(v)))
            .unwrap_or_default();
        let _ = writeln!(
            out,
            "  Score:    {} Nutri-Score {score}{value} [{}]",
            score.tone().marker(),
            score.color_hex()
        );
    }
    if let Some(serving) = &scan.serving_size {
        let _ = writeln!(out, "  Serving:  {serving}");
    }
    if let Some(ms) = scan.processing_time_ms {
        let _ = writeln!(out, "  Analysed in {ms} ms");
    }
    if let Some(message) = &scan.error_message {
        let _ = writeln!(out, "  Error:    {message}");
    }

    if let Some(nutrients) = &scan.nutrients {
        let _ = writeln!(out, "  Nutrients:");
        for field in NutrientField::iter() {
            if let Some(value) = field.value_in(nutrients) {
                let _ = writeln!(out, "    {:<16} {:>8} {}", field, number(value), field.unit());
            }
        }
    }

    if let Some(highlights) = scan.highlights.as_ref().filter(|h| !h.is_empty()) {
        let _ = writeln!(out, "  Highlights:");
        for h in highlights {
            let _ = writeln!(
                out,
                "    {} {} {}{} ({}): {}",
                h.level.tone().marker(),
                h.name,
                number(h.value),
                h.unit,
                h.level,
                h.message
            );
        }
    }

    if let Some(insights) = scan.insights.as_ref().filter(|i| !i.is_empty()) {
        let _ = writeln!(out, "  Insights:");
        for insight in insights {
            let _ = writeln!(
                out,
                "    {} {}: {}",
                insight.kind.tone().marker(),
                insight.title,
                insight.message
            );
        }
    }
    out.trim_end().to_string()
}

pub fn history(page: &PaginatedScans) -> String {
    let mut out = String::new();
    for scan in &page.scans {
        let _ = writeln!(out, "{}", scan_line(scan));
    }
    let _ = write!(
        out,
        "Page {}/{} ({} scans)",
        page.page,
        page.total_pages.max(1),
        page.total
    );
    out
}

pub fn outcome(outcome: &PollOutcome) -> String {
    match outcome {
        PollOutcome::Completed(scan) => format!("Scan completed!\n{}", scan_detail(scan)),
        PollOutcome::Failed { scan, message } => {
            format!("✖ Processing failed: {message}\n{}", scan_line(scan))
        }
        PollOutcome::TimedOut { attempts, last } => format!(
            "⚠ {} ({attempts} checks, last status {})",
            outcome.message().unwrap_or_default(),
            last.status
        ),
        PollOutcome::FetchFailed { message, detail } => format!("✖ {message}: {detail}"),
        PollOutcome::Cancelled { last } => match last {
            Some(scan) => format!(
                "· Stopped waiting. Check later with `nutriscan show {}`",
                scan.id
            ),
            None => "· Stopped waiting.".to_string(),
        },
    }
}

pub fn product(product: &Product) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{}{}",
        product.name.as_deref().unwrap_or("Unknown product"),
        product
            .brand
            .as_deref()
            .map(|brand| format!(" ({brand})"))
            .unwrap_or_default()
    );
    let _ = writeln!(out, "  Barcode: {}", product.barcode);
    if let Some(score) = product.nutri_score {
        let _ = writeln!(out, "  Score:   {} Nutri-Score {score}", score.tone().marker());
    }
    if let Some(serving) = &product.serving_size {
        let _ = writeln!(out, "  Serving: {serving}");
    }
    if let Some(n) = &product.nutrients {
        let rows = [
            ("energy", n.energy, "kcal"),
            ("protein", n.protein, "g"),
            ("fat", n.fat, "g"),
            ("saturated_fat", n.saturated_fat, "g"),
            ("carbohydrate", n.carbohydrate, "g"),
            ("sugars", n.sugars, "g"),
            ("fiber", n.fiber, "g"),
            ("sodium", n.sodium, "mg"),
            ("salt", n.salt, "g"),
        ];
        for (name, value, unit) in rows {
            if let Some(value) = value {
                let _ = writeln!(out, "    {name:<16} {:>8} {unit}", number(value));
            }
        }
    }
    let _ = write!(out, "  Source:  {}", product.source);
    out
}

pub fn comparison(result: &CompareResponse) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "A: {}   B: {}",
        result.product_a.name, result.product_b.name
    );
    for row in &result.comparisons {
        let value = |v: Option<f64>| v.map(number).unwrap_or_else(|| "-".to_string());
        let _ = writeln!(
            out,
            "  {} {:<16} {:>8} {:>8} {:<5} winner {}{}",
            row.winner.tone().marker(),
            row.name,
            value(row.value_a),
            value(row.value_b),
            row.unit,
            row.winner,
            row.note
                .as_deref()
                .map(|note| format!(" ({note})"))
                .unwrap_or_default()
        );
    }
    let _ = write!(
        out,
        "{} Overall: {}. {}",
        result.winner.tone().marker(),
        result.winner,
        result.verdict
    );
    out
}

pub fn corrections(list: &[Correction]) -> String {
    if list.is_empty() {
        return "No corrections yet".to_string();
    }
    list.iter()
        .map(|c| {
            format!(
                "{} {:<16} {} -> {} ({})",
                c.status.tone().marker(),
                c.field_name,
                c.original_value.as_deref().unwrap_or("-"),
                c.corrected_value,
                c.status
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn user(user: &User) -> String {
    format!(
        "{} <{}>\n  Role: {} {}\n  Id:   {}",
        user.name,
        user.email,
        user.role.tone().marker(),
        user.role,
        user.id
    )
}

pub fn admin_stats(stats: &AdminStats) -> String {
    format!(
        "Users:    {} ({} active)\nScans:    {}\nProducts: {}",
        stats.total_users, stats.active_users, stats.total_scans, stats.total_products
    )
}

pub fn admin_user(user: &AdminUser) -> String {
    format!(
        "{} {:<36} {:<6} {} <{}>",
        user.role.tone().marker(),
        user.id,
        user.role,
        user.name,
        user.email
    )
}

pub fn admin_users(page: &PaginatedUsers) -> String {
    let mut out = String::new();
    for user in &page.users {
        let _ = writeln!(out, "{}", admin_user(user));
    }
    let _ = write!(
        out,
        "Page {}/{} ({} users)",
        page.page,
        page.total_pages.max(1),
        page.total
    );
    out
}
