// src/templates.rs
use crate::models::document::LetterPreview;
use askama::Template;

/// Rendered letter document (`templates/letter.html`).
#[derive(Template)]
#[template(path = "letter.html")]
pub struct LetterDocument<'a> {
    pub letter: &'a LetterPreview,
    /// Body split on blank lines.
    pub paragraphs: Vec<&'a str>,
}

impl<'a> LetterDocument<'a> {
    pub fn new(letter: &'a LetterPreview) -> Self {
        let paragraphs = letter
            .main_content
            .split("\n\n")
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();
        Self { letter, paragraphs }
    }
}
