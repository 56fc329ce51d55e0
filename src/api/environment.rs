use axum::response::Html;

const REDACTED: &str = "[redacted]";
const SENSITIVE_MARKERS: [&str; 3] = ["PASSWORD", "TOKEN", "SECRET"];

/// GET / - Process environment as an HTML list
pub async fn dump_environment() -> Html<String> {
    Html(render_environment(std::env::vars()))
}

pub fn render_environment<I>(vars: I) -> String
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut vars: Vec<(String, String)> = vars.into_iter().collect();
    vars.sort();

    let mut html = String::from("<h1>Environment</h1>\n<ul>\n");
    for (key, value) in &vars {
        let value = if is_sensitive(key) { REDACTED } else { value.as_str() };
        html.push_str(&format!(
            "<li><b>{}</b> = {}</li>\n",
            escape_html(key),
            escape_html(value)
        ));
    }
    html.push_str("</ul>\n");
    html
}

fn is_sensitive(key: &str) -> bool {
    let upper = key.to_ascii_uppercase();
    SENSITIVE_MARKERS.iter().any(|m| upper.contains(m))
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
