//! Server-rendered form page: one textarea, one submit button, the keyword list.

use crate::error::RunError;
use crate::extract::Extraction;
use std::fmt::Write;

/// What the page shows below the form.
pub enum Outcome<'a> {
    Idle,
    Displayed(&'a Extraction),
    Failed(&'a RunError),
}

pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

pub fn render(note: &str, outcome: Outcome<'_>) -> String {
    let mut body = String::new();
    match outcome {
        Outcome::Idle => {}
        Outcome::Displayed(extraction) => {
            body.push_str("<h2>Extracted Features:</h2>\n<ul class=\"keywords\">\n");
            for kw in &extraction.keywords {
                let _ = writeln!(body, "<li>{}</li>", escape(kw));
            }
            body.push_str("</ul>\n<details><summary>Model response</summary>\n");
            for part in &extraction.response {
                let _ = writeln!(body, "<pre>{}</pre>", escape(part));
            }
            body.push_str("</details>\n");
        }
        Outcome::Failed(err) => {
            let headline = match err {
                RunError::Generation(_) => "The model did not answer. Please try again.",
                RunError::Parse(_) => "Could not extract keywords from the model's answer.",
            };
            let _ = writeln!(
                body,
                "<div class=\"error\" data-kind=\"{}\"><strong>{}</strong><br><small>{}</small></div>",
                err.kind(),
                headline,
                escape(&err.to_string())
            );
        }
    }

    format!(
        r#"<!doctype html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Patient note keywords</title>
<style>
body {{ font-family: sans-serif; max-width: 48rem; margin: 2rem auto; }}
textarea {{ width: 100%; }}
.error {{ border: 1px solid #c00; padding: .5rem; color: #900; }}
</style>
</head>
<body>
<form method="post" action="/">
<label for="note">Enter patient note:</label>
<textarea id="note" name="note" rows="10">
{note}</textarea>
<button type="submit">Submit</button>
</form>
{body}</body>
</html>
"#,
        note = escape(note),
        body = body
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{GenerationError, ParseError};

    #[test]
    fn escapes_markup() {
        assert_eq!(escape(r#"<b>"a" & 'b'</b>"#), "&lt;b&gt;&quot;a&quot; &amp; &#39;b&#39;&lt;/b&gt;");
    }

    #[test]
    fn idle_page_has_form_only() {
        let html = render("", Outcome::Idle);
        assert!(html.contains(r#"<textarea id="note" name="note""#));
        assert!(html.contains("Submit"));
        assert!(!html.contains("Extracted Features:"));
    }

    #[test]
    fn displayed_page_lists_each_keyword() {
        let extraction = crate::extract::extract_keywords("x[/INST] SOB, <chest pain>").unwrap();
        let html = render("note <1>", Outcome::Displayed(&extraction));
        assert!(html.contains("Extracted Features:"));
        assert!(html.contains("<li> SOB</li>"));
        assert!(html.contains("<li> &lt;chest pain&gt;</li>"));
        assert!(html.contains("rows=\"10\">\nnote &lt;1&gt;</textarea>"));
    }

    #[test]
    fn leading_newline_in_note_survives_textarea_parsing() {
        // the parser swallows one newline right after <textarea>, so the note's own must follow it
        let html = render("\nline two", Outcome::Idle);
        assert!(html.contains("rows=\"10\">\n\nline two</textarea>"));
    }

    #[test]
    fn failures_are_distinguished() {
        let gen = RunError::Generation(GenerationError::Backend("oom".into()));
        let parse = RunError::Parse(ParseError::MissingDelimiter);
        let g = render("n", Outcome::Failed(&gen));
        let p = render("n", Outcome::Failed(&parse));
        assert!(g.contains("try again"));
        assert!(p.contains("Could not extract keywords"));
        assert!(p.contains(r#"data-kind="parse""#));
    }
}
