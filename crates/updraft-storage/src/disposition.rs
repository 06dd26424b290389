//! Content-Disposition header values for serving uploads.
//!
//! Both header forms are emitted: a quoted ASCII fallback `filename` and the
//! RFC 5987 `filename*` parameter for non-ASCII names.

/// `attachment` disposition: the browser downloads instead of rendering.
pub fn attachment(filename: &str) -> String {
    format_disposition("attachment", filename)
}

/// `inline` disposition: render in the browser when the type allows it.
pub fn inline(filename: &str) -> String {
    format_disposition("inline", filename)
}

fn format_disposition(kind: &str, filename: &str) -> String {
    format!(
        "{}; filename=\"{}\"; filename*=UTF-8''{}",
        kind,
        ascii_fallback(filename),
        urlencoding::encode(filename)
    )
}

/// Quoted-string-safe ASCII rendition of a filename.
fn ascii_fallback(filename: &str) -> String {
    filename
        .chars()
        .map(|c| {
            if c.is_ascii() && !c.is_ascii_control() && c != '"' && c != '\\' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
