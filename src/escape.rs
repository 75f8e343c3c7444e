/// Entity-escapes text bound for any external sink (HTML, CSV, PDF).
///
/// Every export path runs values through this one function so the artifacts
/// stay byte-identical with what the on-screen report shows.
pub fn html_safe(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            _ => out.push(ch),
        }
    }
    out
}
