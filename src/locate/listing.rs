//! One-line-per-publication listing used for disambiguation.
//!
//! ```text
//!   smith.2019  smith19  On the Origin of Widgets
//! vaswani.2017      attn  Attention Is All You Need
//! ```

use std::io::Write;

use crate::store::{Publication, Store, StoreError};

use super::LocateError;

const DEFAULT_WIDTH: usize = 80;

/// Current terminal width from `COLUMNS`, or 80.
fn terminal_width() -> usize {
    std::env::var("COLUMNS")
        .ok()
        .and_then(|value| value.trim().parse().ok())
        .filter(|&width| width > 0)
        .unwrap_or(DEFAULT_WIDTH)
}

struct Row {
    nfas: String,
    year: String,
    nickname: String,
    title: String,
}

/// Formats `pubs` as listing lines, titles cut to `width` columns.
///
/// # Errors
///
/// Returns a [`StoreError`] if a nickname lookup fails.
pub async fn format_generic_listing(
    store: &Store,
    pubs: &[Publication],
    width: usize,
) -> Result<Vec<String>, StoreError> {
    let mut rows = Vec::with_capacity(pubs.len());
    for publication in pubs {
        rows.push(Row {
            nfas: publication
                .nfas
                .clone()
                .unwrap_or_else(|| "(no author)".to_string()),
            year: publication
                .year
                .map_or_else(|| "????".to_string(), |year| format!("{year:04}")),
            nickname: store.choose_nickname(publication.id).await?.unwrap_or_default(),
            title: publication
                .title
                .clone()
                .unwrap_or_else(|| "(no title)".to_string()),
        });
    }

    let nfas_width = rows.iter().map(|row| row.nfas.chars().count()).max().unwrap_or(0);
    let nick_width = rows
        .iter()
        .map(|row| row.nickname.chars().count())
        .max()
        .unwrap_or(0);

    Ok(rows
        .into_iter()
        .map(|row| {
            let prefix = format!(
                "{:>nfas_width$}.{}  {:>nick_width$}  ",
                row.nfas, row.year, row.nickname
            );
            let room = width.saturating_sub(prefix.chars().count());
            format!("{prefix}{}", truncate(&row.title, room))
        })
        .collect())
}

/// Writes the listing for `pubs` to `out` at the terminal width.
///
/// # Errors
///
/// Returns [`LocateError::Store`] or [`LocateError::Output`].
pub async fn print_generic_listing(
    store: &Store,
    pubs: &[Publication],
    out: &mut dyn Write,
) -> Result<(), LocateError> {
    for line in format_generic_listing(store, pubs, terminal_width()).await? {
        writeln!(out, "{line}")?;
    }
    Ok(())
}

fn truncate(text: &str, room: usize) -> String {
    if text.chars().count() <= room {
        return text.to_string();
    }
    if room == 0 {
        return String::new();
    }
    let mut cut: String = text.chars().take(room - 1).collect();
    cut.push('…');
    cut
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::Database;
    use crate::store::PubFields;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("exactly10!", 10), "exactly10!");
        assert_eq!(truncate("a longer title", 6), "a lon…");
        assert_eq!(truncate("anything", 0), "");
    }

    #[tokio::test]
    async fn test_listing_aligns_columns() {
        let store = Store::new(Database::new_in_memory().await.unwrap());
        let first = store
            .learn(PubFields {
                title: Some("Attention Is All You Need".to_string()),
                year: Some(2017),
                authors: vec!["Ashish Vaswani".to_string()],
                nicknames: vec!["attn".to_string(), "transformer".to_string()],
                ..PubFields::default()
            })
            .await
            .unwrap();
        let second = store
            .learn(PubFields {
                title: None,
                year: None,
                authors: vec!["J. Li".to_string()],
                nicknames: vec!["li".to_string()],
                ..PubFields::default()
            })
            .await
            .unwrap();

        let lines = format_generic_listing(&store, &[first, second], 80)
            .await
            .unwrap();

        assert_eq!(
            lines,
            vec![
                "vaswani.2017  attn  Attention Is All You Need".to_string(),
                "     li.????    li  (no title)".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_listing_truncates_long_titles() {
        let store = Store::new(Database::new_in_memory().await.unwrap());
        let publication = store
            .learn(PubFields {
                title: Some("x".repeat(200)),
                year: Some(2001),
                authors: vec!["A. Bee".to_string()],
                ..PubFields::default()
            })
            .await
            .unwrap();

        let lines = format_generic_listing(&store, &[publication], 40)
            .await
            .unwrap();

        assert_eq!(lines[0].chars().count(), 40);
        assert!(lines[0].ends_with('…'));
    }
}
