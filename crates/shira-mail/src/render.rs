//! HTML body of the daily letter.
//!
//! Metadata strings (title, author, date, source, urls) are escaped. The poem
//! rendering and the commentary are already markup and are inserted as-is.

use shira_core::escape_html;

const FONT_STACK: &str = "Tahoma, Verdana, Segoe, sans-serif";

/// Everything the letter shows.
#[derive(Debug, Clone, Copy)]
pub struct Letter<'a> {
    pub title: &'a str,
    pub author: &'a str,
    /// Display date; empty when unknown.
    pub date: &'a str,
    pub source: Option<&'a str>,
    pub portrait: Option<&'a str>,
    /// `<br>`-joined poem lines from the normaliser.
    pub poem_markup: &'a str,
    pub page_url: Option<&'a str>,
    pub commentary: &'a str,
}

/// Render a complete right-to-left HTML document.
pub fn render_message(letter: &Letter<'_>) -> String {
    let portrait = letter
        .portrait
        .map(|src| {
            format!(
                "<img src=\"{}\" alt=\"\" style=\"width:80px; height:80px; border-radius:50%; \
                 float:left; margin-right:15px; border:2px solid #333; object-fit:cover;\">",
                escape_html(src)
            )
        })
        .unwrap_or_default();

    let date = if letter.date.is_empty() {
        String::new()
    } else {
        format!(" | {}", escape_html(letter.date))
    };

    let source = match letter.source {
        Some(s) if !s.trim().is_empty() => format!(
            "<br><span style=\"font-size:14px; color:#777;\">מקור: {}</span>",
            escape_html(s)
        ),
        _ => String::new(),
    };

    let read_more = letter
        .page_url
        .map(|url| {
            format!(
                "<a href=\"{}\" style=\"color:#666; text-decoration:none; border-bottom:1px solid #ccc; \
                 font-size:14px; display:inline-block; margin-bottom:30px;\">לקריאה באתר בן-יהודה ➜</a>",
                escape_html(url)
            )
        })
        .unwrap_or_default();

    format!(
        r#"<!DOCTYPE html>
<html lang="he" dir="rtl">
<head>
<meta charset="utf-8">
<style>
  body, h1, h2, h3, p, div {{ font-family: {FONT_STACK} !important; }}
  .ai-box {{ background:#f8f9fa; padding:25px; border-radius:8px; border-right:4px solid #333; font-size:16px; line-height:1.6; }}
  .ai-box h3 {{ color:#000; margin-top:20px; margin-bottom:10px; font-weight:bold; }}
  .ai-box p, .ai-box div {{ text-align:justify !important; text-justify:inter-word; }}
</style>
</head>
<body style="margin:0; padding:0; background-color:#f4f4f4;">
<div style="background-color:#fff; color:#222; max-width:650px; margin:20px auto; padding:30px; border-radius:8px; line-height:1.6; direction:rtl; text-align:right;">
  <div style="border-bottom:1px solid #eee; padding-bottom:20px; margin-bottom:25px; overflow:hidden;">
    {portrait}
    <h1 style="margin:0; font-size:26px; font-weight:bold; color:#111;">{title}</h1>
    <div style="font-size:16px; color:#666; margin-top:5px;">{author}{date}{source}</div>
  </div>
  <div style="font-size:20px; margin-bottom:40px; line-height:1.8; color:#000;">
    <div style="direction:rtl; text-align:right;">{poem}</div>
  </div>
  {read_more}
  <div class="ai-box">
{commentary}
  </div>
  <div style="text-align:center; font-size:11px; color:#aaa; margin-top:40px;">בוט בן-יהודה</div>
</div>
</body>
</html>
"#,
        title = escape_html(letter.title),
        author = escape_html(letter.author),
        poem = letter.poem_markup,
        commentary = letter.commentary,
    )
}
