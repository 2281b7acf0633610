pub mod recordings;
pub mod text;

use once_cell::sync::Lazy;
use reqwest::Url;
use scraper::{Html, Selector};

use crate::store::KirtanRecord;

/// Status cell text shown when a kirtan has no audio or video.
pub const NO_MEDIA_TEXT: &str = "કોઈ ઑડિયો / વીડિયો ઉપલબ્ધ નથી";

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("valid selector")
}

static STATUS_CELL: Lazy<Selector> = Lazy::new(|| selector("#ctl00_ContentPlaceHolder1_td1"));
static KIRTAN_NAME: Lazy<Selector> =
    Lazy::new(|| selector("#ctl00_ContentPlaceHolder1_tdKirtanName"));
static FULL_TEXT: Lazy<Selector> =
    Lazy::new(|| selector("#pagecontent > table:nth-child(7) > tbody > tr:nth-child(3) > td"));
static PRIMARY_VERSE: Lazy<Selector> =
    Lazy::new(|| selector("#ctl00_ContentPlaceHolder1_tdHKirtanPadBody"));
static MELODY_INFO: Lazy<Selector> =
    Lazy::new(|| selector("#ctl00_ContentPlaceHolder1_tdHKirtanMaltaRagBody"));
static CREATOR: Lazy<Selector> =
    Lazy::new(|| selector("#ctl00_ContentPlaceHolder1_tdKirtanGayakBody"));
static NON_STOP_LABEL: Lazy<Selector> =
    Lazy::new(|| selector("#ctl00_ContentPlaceHolder1_tdHKirtanPrakashakHeader"));
static ORIGIN_LABEL: Lazy<Selector> =
    Lazy::new(|| selector("#ctl00_ContentPlaceHolder1_tdHKirtanBhashantarHeader"));
static COMMENTARY_LABEL: Lazy<Selector> =
    Lazy::new(|| selector("#ctl00_ContentPlaceHolder1_tdHKirtanVivechakHeader"));
static PHOTO: Lazy<Selector> = Lazy::new(|| {
    selector(
        "#ctl00_ContentPlaceHolder1_DataList1 > tbody > tr > td:nth-child(1) > table > tbody > tr > td img",
    )
});

/// Build a record from a rendered detail page. Missing fields become `None`;
/// this never fails.
pub fn parse_detail(html: &str, page_url: &str) -> KirtanRecord {
    let doc = Html::parse_document(html);
    let base = Url::parse(page_url).ok();

    let recordings = if has_no_media(&doc) {
        Vec::new()
    } else {
        recordings::extract(&doc, base.as_ref())
    };

    KirtanRecord {
        kirtan_name: locate(&doc, &KIRTAN_NAME),
        full_text: locate(&doc, &FULL_TEXT),
        primary_verse: locate(&doc, &PRIMARY_VERSE),
        melody_info: locate(&doc, &MELODY_INFO),
        creator: locate(&doc, &CREATOR),
        non_stop_label: locate(&doc, &NON_STOP_LABEL),
        origin_label: locate(&doc, &ORIGIN_LABEL),
        commentary_label: locate(&doc, &COMMENTARY_LABEL),
        photo_url: doc
            .select(&PHOTO)
            .next()
            .and_then(|img| resolve(img.value().attr("src"), base.as_ref())),
        recordings,
    }
}

/// Rendered text of the first element matching `sel`.
pub fn locate(doc: &Html, sel: &Selector) -> Option<String> {
    doc.select(sel).next().and_then(text::inner_text)
}

fn has_no_media(doc: &Html) -> bool {
    locate(doc, &STATUS_CELL).is_some_and(|t| t.contains(NO_MEDIA_TEXT))
}

/// Absolute form of a `href`/`src` attribute, as the browser would report it.
pub(crate) fn resolve(attr: Option<&str>, base: Option<&Url>) -> Option<String> {
    let raw = attr.map(str::trim).filter(|a| !a.is_empty())?;
    match base {
        Some(base) => base.join(raw).ok().map(String::from),
        None => Some(raw.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE_URL: &str = "https://www.swaminarayankirtan.org/Kirtan_Display.aspx?Kid=501";

    fn fixture(name: &str) -> String {
        std::fs::read_to_string(format!("tests/fixtures/{}.html", name)).unwrap()
    }

    #[test]
    fn detail_scalar_fields() {
        let r = parse_detail(&fixture("detail"), PAGE_URL);
        assert_eq!(r.kirtan_name.as_deref(), Some("Aaj Sakhi Anand Ni Heli"));
        assert_eq!(r.primary_verse.as_deref(), Some("Aaj sakhi anand ni heli"));
        assert_eq!(r.melody_info.as_deref(), Some("Raag Bhairavi"));
        assert_eq!(r.creator.as_deref(), Some("Premanand Swami"));
        assert_eq!(r.non_stop_label.as_deref(), Some("Non Stop Kirtan"));
        assert_eq!(r.origin_label.as_deref(), Some("Utpatti"));
        assert_eq!(r.commentary_label.as_deref(), Some("Vivechan"));
        assert_eq!(
            r.photo_url.as_deref(),
            Some("https://www.swaminarayankirtan.org/images/kirtan/501.jpg")
        );
    }

    #[test]
    fn detail_full_text_keeps_lines() {
        let r = parse_detail(&fixture("detail"), PAGE_URL);
        assert_eq!(
            r.full_text.as_deref(),
            Some("Aaj sakhi anand ni heli\nHari mukh jovani veli\n\nBiju pad line one")
        );
    }

    #[test]
    fn detail_recordings() {
        let r = parse_detail(&fixture("detail"), PAGE_URL);
        // header row and the empty spacer row are dropped
        assert_eq!(r.recordings.len(), 2);

        let first = &r.recordings[0];
        assert_eq!(
            first.audio_link.as_deref(),
            Some("https://www.swaminarayankirtan.org/Audio/501_1.mp3")
        );
        assert_eq!(first.gayak.as_deref(), Some("Hemant Chauhan"));
        assert_eq!(first.rag.as_deref(), Some("Bhairavi"));
        assert_eq!(first.prakashak.as_deref(), Some("Swaminarayan Mandir"));
        assert_eq!(first.recording_quality.as_deref(), Some("Good"));
        assert_eq!(first.swarkar.as_deref(), Some("Kishor Manraja"));
        assert_eq!(first.cd_name.as_deref(), Some("Kirtan Sagar"));
        assert_eq!(first.live_or_studio.as_deref(), Some("Studio"));
        assert_eq!(first.audio_or_video.as_deref(), Some("Audio"));
        assert_eq!(first.rating.as_deref(), Some("4.5"));

        let second = &r.recordings[1];
        assert_eq!(second.audio_link, None);
        assert_eq!(second.gayak.as_deref(), Some("Sant Mandal"));
        assert_eq!(second.live_or_studio.as_deref(), Some("Live"));
        assert_eq!(second.rating, None);
    }

    #[test]
    fn no_media_forces_empty_recordings() {
        let r = parse_detail(&fixture("detail_no_media"), PAGE_URL);
        assert!(r.recordings.is_empty());
        // the table on this page still has a filled row
        assert_eq!(r.kirtan_name.as_deref(), Some("Vandu Sahajanand"));
        assert_eq!(r.creator.as_deref(), Some("Brahmanand Swami"));
        assert_eq!(r.photo_url, None);
        assert_eq!(r.full_text, None);
    }

    #[test]
    fn empty_page_is_all_none() {
        let r = parse_detail("<html><body></body></html>", PAGE_URL);
        assert_eq!(r, KirtanRecord::default());
    }

    #[test]
    fn no_entry_is_ever_empty() {
        for name in ["detail", "detail_no_media"] {
            let r = parse_detail(&fixture(name), PAGE_URL);
            assert!(r.recordings.iter().all(|e| !e.is_empty()));
        }
    }

    #[test]
    fn resolve_relative_and_absolute() {
        let base = Url::parse(PAGE_URL).unwrap();
        assert_eq!(
            resolve(Some("img/a.jpg"), Some(&base)).as_deref(),
            Some("https://www.swaminarayankirtan.org/img/a.jpg")
        );
        assert_eq!(
            resolve(Some("https://cdn.example.org/a.mp3"), Some(&base)).as_deref(),
            Some("https://cdn.example.org/a.mp3")
        );
        assert_eq!(resolve(Some("  "), Some(&base)), None);
        assert_eq!(resolve(None, Some(&base)), None);
        assert_eq!(resolve(Some("a.jpg"), None).as_deref(), Some("a.jpg"));
    }
}
