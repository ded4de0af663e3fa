use crate::error::ParseError;
use crate::prompt::INST_CLOSE;
use serde::Serialize;
use std::collections::BTreeSet;

/// Keywords pulled out of one generation, plus the raw split kept for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Extraction {
    pub keywords: BTreeSet<String>,
    pub response: Vec<String>,
}

/// Parse a full generated sequence (echoed prompt + answer) into keywords.
///
/// `response` is the generated text split on every `[/INST]`. Keywords come
/// from `response[1]` only, the text between the first and second delimiter,
/// split on `,` and deduplicated by exact string; pieces keep their
/// surrounding whitespace.
pub fn extract_keywords(generated: &str) -> Result<Extraction, ParseError> {
    let response: Vec<String> = generated.split(INST_CLOSE).map(str::to_string).collect();
    let answer = response.get(1).ok_or(ParseError::MissingDelimiter)?;
    if response.len() > 2 {
        tracing::warn!(
            delimiters = response.len() - 1,
            "generated text repeats the instruction delimiter; text after the second is dropped"
        );
    }

    let keywords = answer.split(',').map(str::to_string).collect();
    Ok(Extraction { keywords, response })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn dedups_repeated_tokens() {
        let out = extract_keywords("[/INST]a,b,a,c").unwrap();
        assert_eq!(out.keywords, set(&["a", "b", "c"]));
        assert_eq!(out.response, vec!["".to_string(), "a,b,a,c".to_string()]);
    }

    #[test]
    fn keeps_whitespace_untrimmed() {
        let out = extract_keywords("echo[/INST] tachycardia, SOB, chest pressure").unwrap();
        assert_eq!(out.keywords, set(&[" tachycardia", " SOB", " chest pressure"]));
        assert!(!out.keywords.contains("SOB"));
    }

    #[test]
    fn whitespace_variants_are_distinct() {
        let out = extract_keywords("[/INST]SOB, SOB,SOB").unwrap();
        assert_eq!(out.keywords, set(&["SOB", " SOB"]));
    }

    #[test]
    fn missing_delimiter_is_parse_error() {
        assert_eq!(
            extract_keywords("no closing tag here, at all"),
            Err(ParseError::MissingDelimiter)
        );
        assert_eq!(extract_keywords(""), Err(ParseError::MissingDelimiter));
    }

    #[test]
    fn empty_answer_yields_single_empty_keyword() {
        let out = extract_keywords("prompt[/INST]").unwrap();
        assert_eq!(out.keywords, set(&[""]));
    }

    #[test]
    fn repeated_delimiter_keeps_only_second_part() {
        let out = extract_keywords("<s>[INST]note[/INST] tachycardia, SOB[/INST] ignore, this").unwrap();
        assert_eq!(out.keywords, set(&[" tachycardia", " SOB"]));
        assert_eq!(out.response, vec!["<s>[INST]note", " tachycardia, SOB", " ignore, this"]);
    }

    #[test]
    fn keywords_match_second_response_part() {
        for text in ["a[/INST]x,y,x", "[/INST]", "p[/INST]a,b[/INST]c,d[/INST]e", "q[/INST] , ,z"] {
            let out = extract_keywords(text).unwrap();
            let expected: BTreeSet<String> = out.response[1].split(',').map(str::to_string).collect();
            assert_eq!(out.keywords, expected, "input: {text:?}");
        }
    }
}
