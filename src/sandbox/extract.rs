/// Returns the text between the first `<tag>` and the next `</tag>` after it.
///
/// Returns `""` when either tag is missing; a missing tag is not an error.
pub fn extract_tag<'a>(text: &'a str, tag: &str) -> &'a str {
    let open = format!("<{tag}>");
    let close = format!("</{tag}>");

    let Some(start) = text.find(&open) else {
        return "";
    };
    let content_start = start + open.len();
    match text[content_start..].find(&close) {
        Some(len) => &text[content_start..content_start + len],
        None => "",
    }
}
