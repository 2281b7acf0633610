use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use tracing::info;

use crate::store;

pub const LISTING_HTML_PATH: &str = "data.html";

/// Anchors of the kirtan listing grid.
static LISTING_ANCHORS: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("table#ctl00_ContentPlaceHolder1_grdkirtan a").expect("valid selector")
});

// ASCII digits only; `\d` would also accept other Unicode digits.
static KID_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Kid=([0-9]+)").expect("valid regex"));

/// Extract unique Kid values from a saved listing page, in document order.
pub fn extract_kids(html: &str) -> Vec<String> {
    let doc = Html::parse_document(html);
    let mut seen = HashSet::new();
    let mut kids = Vec::new();

    for anchor in doc.select(&LISTING_ANCHORS) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        let Some(kid) = KID_PATTERN.captures(href).map(|c| c[1].to_string()) else {
            continue;
        };
        if seen.insert(kid.clone()) {
            kids.push(kid);
        }
    }

    kids
}

/// Read the listing snapshot, extract its Kid values and append them to the list file.
pub fn extract_to_file(html_path: &Path, list_path: &Path) -> Result<Vec<String>> {
    let html = std::fs::read_to_string(html_path)
        .with_context(|| format!("Failed to read listing page {}", html_path.display()))?;

    let kids = extract_kids(&html);
    info!("Found {} unique Kid values in {}", kids.len(), html_path.display());

    store::append_kids(list_path, &kids)?;
    info!("Appended to {}", list_path.display());
    Ok(kids)
}
