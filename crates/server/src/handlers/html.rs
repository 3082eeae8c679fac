//! Small HTML building blocks for the server-rendered pages.

use axum::response::Html;
use std::fmt::Write;
use time::Date;
use time::macros::format_description;

/// Escape text for use in element content and quoted attributes.
pub fn escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            c => out.push(c),
        }
    }
    out
}

/// Wrap `body` in the shared page chrome.
pub fn page(title: &str, body: &str) -> Html<String> {
    Html(format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>{title} - Invoicer</title>\n</head>\n<body>\n\
         <nav><a href=\"/\">Projects</a> | <a href=\"/logout\">Log out</a></nav>\n\
         <main>\n{body}\n</main>\n</body>\n</html>\n",
        title = escape(title),
    ))
}

/// A POST form holding a single submit button.
pub fn button_form(action: &str, label: &str) -> String {
    format!(
        "<form action=\"{}\" method=\"post\" class=\"inline\"><button type=\"submit\">{}</button></form>",
        escape(action),
        escape(label)
    )
}

/// `2024-03-01`, or an empty string.
pub fn date_value(date: Option<Date>) -> String {
    let format = format_description!("[year]-[month]-[day]");
    date.and_then(|d| d.format(&format).ok()).unwrap_or_default()
}

/// `Mar 01, 2024`, as printed on invoices.
pub fn long_date(date: Date) -> String {
    let format = format_description!("[month repr:short] [day], [year]");
    date.format(&format).unwrap_or_default()
}

/// Append a table row of already-escaped cells.
pub fn push_row(out: &mut String, cells: &[&str]) {
    out.push_str("<tr>");
    for cell in cells {
        let _ = write!(out, "<td>{cell}</td>");
    }
    out.push_str("</tr>\n");
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn test_escape() {
        assert_eq!(
            escape(r#"<a href="x">Tom & 'Jerry'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; &#x27;Jerry&#x27;&lt;/a&gt;"
        );
    }

    #[test]
    fn test_page_escapes_title() {
        let Html(body) = page("<script>", "<p>ok</p>");
        assert!(body.contains("<title>&lt;script&gt; - Invoicer</title>"));
        assert!(body.contains("<p>ok</p>"));
    }

    #[test]
    fn test_dates() {
        assert_eq!(date_value(Some(date!(2024 - 03 - 01))), "2024-03-01");
        assert_eq!(date_value(None), "");
        assert_eq!(long_date(date!(2024 - 03 - 01)), "Mar 01, 2024");
    }
}
