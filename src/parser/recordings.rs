use once_cell::sync::Lazy;
use reqwest::Url;
use scraper::{ElementRef, Html, Selector};

use super::{resolve, text::inner_text};
use crate::store::RecordingEntry;

static ROWS: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("#ctl00_ContentPlaceHolder1_grdkirtan tbody tr").expect("valid selector")
});
static AUDIO_LINK: Lazy<Selector> =
    Lazy::new(|| Selector::parse("td:nth-child(1) > a:nth-child(3)").expect("valid selector"));
static RATING: Lazy<Selector> =
    Lazy::new(|| Selector::parse("td:nth-child(10) div").expect("valid selector"));

/// Span cells for columns 2 through 9, in table order.
static SPAN_CELLS: Lazy<Vec<Selector>> = Lazy::new(|| {
    (2..=9)
        .map(|n| Selector::parse(&format!("td:nth-child({}) span", n)).expect("valid selector"))
        .collect()
});

/// Rows of the recordings grid that carry at least one value, in table order.
pub fn extract(doc: &Html, base: Option<&Url>) -> Vec<RecordingEntry> {
    doc.select(&ROWS)
        .map(|row| parse_row(row, base))
        .filter(|entry| !entry.is_empty())
        .collect()
}

fn parse_row(row: ElementRef, base: Option<&Url>) -> RecordingEntry {
    let span = |i: usize| row.select(&SPAN_CELLS[i]).next().and_then(inner_text);

    RecordingEntry {
        audio_link: row
            .select(&AUDIO_LINK)
            .next()
            .and_then(|a| resolve(a.value().attr("href"), base)),
        gayak: span(0),
        rag: span(1),
        prakashak: span(2),
        recording_quality: span(3),
        swarkar: span(4),
        cd_name: span(5),
        live_or_studio: span(6),
        audio_or_video: span(7),
        rating: row.select(&RATING).next().and_then(inner_text),
    }
}
