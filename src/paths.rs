//! Storage path helpers shared by the storage provider and the resolver.
//!
//! Storage paths are always `/`-separated and relative to the storage root,
//! independent of the host platform.

use percent_encoding::{AsciiSet, CONTROLS, percent_decode_str, utf8_percent_encode};

/// Characters escaped in public URL paths. `+` and `%` must be escaped so
/// [`url_decode`] maps the URL back to the same storage path.
const PATH_ESCAPES: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'+')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Decode a public URL path the way form data is decoded: `+` becomes a
/// space and `%XX` escapes are expanded. Invalid UTF-8 is replaced lossily.
pub fn url_decode(input: &str) -> String {
    let plus_decoded = input.replace('+', " ");
    percent_decode_str(&plus_decoded)
        .decode_utf8_lossy()
        .into_owned()
}

/// Percent-encode a storage path for use in a public URL. `/` is kept.
pub fn url_encode_path(path: &str) -> String {
    utf8_percent_encode(path, PATH_ESCAPES).to_string()
}

/// Join two storage path fragments with exactly one `/` between them.
pub fn combine(first: &str, second: &str) -> String {
    let first = first.trim_end_matches('/');
    let second = second.trim_start_matches('/');
    match (first.is_empty(), second.is_empty()) {
        (true, _) => second.to_string(),
        (_, true) => first.to_string(),
        _ => format!("{first}/{second}"),
    }
}

/// Whether `path` lies below `folder`. Leading `/` is ignored on both.
pub fn is_within(path: &str, folder: &str) -> bool {
    let path = path.trim_start_matches('/');
    let folder = folder.trim_matches('/');
    path.strip_prefix(folder)
        .is_some_and(|rest| rest.starts_with('/'))
}

/// Split a path into `(directory-with-trailing-slash, file_name)`.
///
/// - `"img/a.jpg"` → `("img/", "a.jpg")`
/// - `"a.jpg"` → `("", "a.jpg")`
/// - `"img/"` → `("img/", "")`
pub fn split_file_name(path: &str) -> (&str, &str) {
    match path.rfind(['/', '\\']) {
        Some(idx) => path.split_at(idx + 1),
        None => ("", path),
    }
}

/// Replace (or add) the extension of the file name at the end of `path`.
pub fn with_extension(path: &str, extension: &str) -> String {
    let (dir, name) = split_file_name(path);
    let stem = match name.rfind('.') {
        Some(0) | None => name,
        Some(idx) => &name[..idx],
    };
    format!("{dir}{stem}.{extension}")
}

/// Lower-cased extension of the file name at the end of `path`, if any.
pub fn extension(path: &str) -> Option<String> {
    let (_, name) = split_file_name(path);
    match name.rfind('.') {
        Some(0) | None => None,
        Some(idx) => Some(name[idx + 1..].to_ascii_lowercase()),
    }
}
