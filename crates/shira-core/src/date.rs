//! Display formatting for publication dates.

use crate::poem::PublicationDate;

/// Render a publication date for display.
///
/// Preference order:
/// 1. `orig_publication_date` shaped `YYYY-MM-DD` → `DD/MM/YYYY`
/// 2. non-empty `raw_publication_date`, verbatim
/// 3. `year`
/// 4. `""`, meaning the date is unknown
pub fn format_date(date: &PublicationDate) -> String {
    if let Some(formatted) = date.orig_publication_date.as_deref().and_then(day_month_year) {
        return formatted;
    }

    if let Some(raw) = date.raw_publication_date.as_deref().map(str::trim) {
        if !raw.is_empty() {
            return raw.to_string();
        }
    }

    match &date.year {
        Some(year) if !year.is_blank() => year.to_string(),
        _ => String::new(),
    }
}

fn day_month_year(iso: &str) -> Option<String> {
    let parts: Vec<&str> = iso.trim().split('-').collect();
    let [year, month, day] = parts.as_slice() else {
        return None;
    };
    // Tolerate a trailing time component: "2023-05-17T00:00:00Z".
    let day = day.split(['T', ' ']).next().unwrap_or_default();
    if year.is_empty() || month.is_empty() || day.is_empty() {
        return None;
    }
    Some(format!("{day}/{month}/{year}"))
}
