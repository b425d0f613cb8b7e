//! Prompt template for the two-section literary commentary.

/// Inputs for one commentary request.
#[derive(Debug, Clone, Copy)]
pub struct CommentaryRequest<'a> {
    pub title: &'a str,
    pub author: &'a str,
    /// Full normalised poem text; [`build_prompt`] embeds only a prefix.
    pub text: &'a str,
    /// Bibliographic source, when the library has one.
    pub source: Option<&'a str>,
    /// Ask the model to infer the publication year.
    pub missing_date: bool,
}

const MAX_WORDS: usize = 250;

const STRUCTURE: &str = "\
מבנה HTML חובה (הקפד על התגיות):
<div class=\"analysis-section\">
    <h3>הקשר היסטורי-פוליטי</h3>
    <p>(רוח התקופה, המתח שבין היחיד לכלל).</p>

    <h3>קריאה עכשווית</h3>
    <p>(מה השיר אומר להיום? שאלות מוסר ושייכות. סיום נוקב).</p>
</div>

* החזר HTML נקי בלבד.";

/// Build the generation prompt, embedding at most `sample_cap` characters of
/// the poem.
pub fn build_prompt(req: &CommentaryRequest<'_>, sample_cap: usize) -> String {
    let source = match req.source.map(str::trim) {
        Some(s) if !s.is_empty() => format!("מידע ביבליוגרפי (מקור): {s}\n"),
        _ => String::new(),
    };
    let date = if req.missing_date {
        "(שנת הפרסום חסרה. נסה לחלץ אותה אם ניתן).\n"
    } else {
        ""
    };

    format!(
        "כתוב ניתוח פרשני לשיר עברי (עד {MAX_WORDS} מילים).\n\
         היצירה: \"{title}\" מאת \"{author}\".\n\
         {source}\
         טקסט השיר (חלקי): \"{sample}...\"\n\
         {date}\
         \n\
         הנחיה: כתיבה לקורא הומניסט, ישראלי, רגיש, סולד מקיטש.\n\
         \n\
         {STRUCTURE}\n",
        title = req.title,
        author = req.author,
        sample = char_prefix(req.text, sample_cap),
    )
}

/// The first `cap` characters of `text`, never splitting a code point.
fn char_prefix(text: &str, cap: usize) -> &str {
    match text.char_indices().nth(cap) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
