//! Askama template filters.

#![allow(clippy::unnecessary_wraps)]

use std::fmt::Display;

/// Footer copyright year.
///
/// Usage in templates: `{{ ""|current_year }}`
#[askama::filter_fn]
pub fn current_year(_value: impl Display, _env: &dyn askama::Values) -> askama::Result<i32> {
    use chrono::Datelike;
    Ok(chrono::Utc::now().year())
}

/// URL of a fingerprinted static asset.
///
/// Usage in templates: `{{ "css/main.css"|asset_path }}`
#[askama::filter_fn]
pub fn asset_path(value: impl Display, _env: &dyn askama::Values) -> askama::Result<String> {
    Ok(fingerprinted(&value.to_string()))
}

/// Content hash recorded by the build script for `asset`, if any.
fn build_hash(asset: &str) -> Option<&'static str> {
    let hash = match asset {
        "css/main.css" => env!("CSS_HASH"),
        "js/app.js" => env!("APP_JS_HASH"),
        _ => return None,
    };
    (!hash.is_empty()).then_some(hash)
}

/// `/static/<dir>/derived/<stem>.<hash>.<ext>` for hashed assets, the plain
/// `/static/<asset>` path otherwise.
fn fingerprinted(asset: &str) -> String {
    let hashed = build_hash(asset).and_then(|hash| {
        let (dir, file) = asset.rsplit_once('/')?;
        let (stem, ext) = file.rsplit_once('.')?;
        Some(format!("/static/{dir}/derived/{stem}.{hash}.{ext}"))
    });
    hashed.unwrap_or_else(|| format!("/static/{asset}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hashed_assets_point_at_derived_copies() {
        for (asset, hash) in [("css/main.css", env!("CSS_HASH")), ("js/app.js", env!("APP_JS_HASH"))] {
            let path = fingerprinted(asset);
            if hash.is_empty() {
                assert_eq!(path, format!("/static/{asset}"));
            } else {
                assert!(path.contains("/derived/"), "{path}");
                assert!(path.contains(hash), "{path}");
            }
        }
    }

    #[test]
    fn test_unhashed_asset_is_served_as_is() {
        assert_eq!(fingerprinted("js/htmx.min.js"), "/static/js/htmx.min.js");
        assert_eq!(fingerprinted("images/placeholder.svg"), "/static/images/placeholder.svg");
    }
}
