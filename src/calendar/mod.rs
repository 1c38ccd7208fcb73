pub mod dto;
pub mod handlers;
pub mod repo;

use axum::Router;
use time::format_description::FormatItem;
use time::macros::format_description;
use time::Date;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    handlers::routes()
}

pub(crate) const DATE_FORMAT: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// `YYYY-MM-DD` for wire payloads.
pub(crate) fn format_date(date: Date) -> String {
    format!(
        "{:04}-{:02}-{:02}",
        date.year(),
        u8::from(date.month()),
        date.day()
    )
}
