//! Extracts the sheet identifier from a user-supplied sharing link.
//!
//! The external service's sharing links place the spreadsheet id in the
//! second-to-last path segment, e.g.
//! `https://sheets.example.com/spreadsheets/d/<id>/edit`. Nothing else about
//! the URL is interpreted.

use thiserror::Error;
use url::Url;

use crate::types::SheetId;

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("`{link}` is not a well-formed URL")]
    NotAUrl {
        link: String,
        #[source]
        source: url::ParseError,
    },
    #[error("`{link}` does not look like a sheet sharing link: too few path segments")]
    TooFewSegments { link: String },
}

/// Pulls the sheet identifier out of a sharing link. Pure; the link is not
/// dereferenced.
pub fn extract_sheet_id(link: &str) -> Result<SheetId, LinkError> {
    let url = Url::parse(link).map_err(|source| LinkError::NotAUrl {
        link: link.to_owned(),
        source,
    })?;

    let segments: Vec<&str> = url
        .path_segments()
        .map(Iterator::collect)
        .unwrap_or_default();

    match segments.as_slice() {
        [.., id, _] => Ok(SheetId::new((*id).to_owned())),
        _ => Err(LinkError::TooFewSegments {
            link: link.to_owned(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_second_to_last_path_segment() {
        let link = "https://sheets.example.com/spreadsheets/d/abc123XYZ/edit";
        assert_eq!(extract_sheet_id(link).unwrap().as_str(), "abc123XYZ");
    }

    #[test]
    fn works_for_exactly_two_segments() {
        let link = "https://sheets.example.com/abc123/edit";
        assert_eq!(extract_sheet_id(link).unwrap().as_str(), "abc123");
    }

    #[test]
    fn rejects_unparsable_urls() {
        assert!(matches!(
            extract_sheet_id("not a url at all"),
            Err(LinkError::NotAUrl { .. })
        ));
    }

    #[test]
    fn rejects_links_with_one_path_segment() {
        assert!(matches!(
            extract_sheet_id("https://sheets.example.com/onlyone"),
            Err(LinkError::TooFewSegments { .. })
        ));
    }

    #[test]
    fn rejects_links_with_empty_path() {
        assert!(matches!(
            extract_sheet_id("https://sheets.example.com"),
            Err(LinkError::TooFewSegments { .. })
        ));
    }
}
