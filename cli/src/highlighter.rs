use logos::Logos;
use nu_ansi_term::{Color, Style};
use rebl_core::query::TermKind;
use rebl_core::transpiler::lexer::{KEYWORDS, TERSE_KEYWORDS, Token};
use reedline::StyledText;

#[derive(Debug)]
struct PaletteItem<'a> {
    name: &'a str,
    fg: Color,
}

const PALETTE: &[PaletteItem] = &[
    PaletteItem { name: "", fg: Color::White },
    PaletteItem { name: "keyword", fg: Color::Magenta },
    PaletteItem { name: "number", fg: Color::Cyan },
    PaletteItem { name: "string", fg: Color::Green },
    PaletteItem { name: "comment", fg: Color::DarkGray },
    PaletteItem { name: "function", fg: Color::Blue },
    PaletteItem { name: "term", fg: Color::Yellow },
    PaletteItem { name: "invalid", fg: Color::Red },
];

fn color(name: &str) -> Color {
    PALETTE
        .iter()
        .find(|item| item.name == name)
        .map_or(PALETTE[0].fg, |item| item.fg)
}

/// Token-level highlighting for the input line.
pub struct Highlighter {
    terse: bool,
}

impl Highlighter {
    pub fn new(terse: bool) -> Self {
        Self { terse }
    }

    fn classify(&self, token: Token, text: &str, next: Option<Token>) -> &'static str {
        match token {
            Token::Str => "string",
            Token::Number => "number",
            Token::LineComment | Token::BlockComment => "comment",
            Token::HashComment if self.terse => "comment",
            Token::HashComment => "invalid",
            Token::ThinArrow if !self.terse => "invalid",
            Token::FatArrow | Token::ThinArrow => "keyword",
            Token::Ident if KEYWORDS.contains(&text) => "keyword",
            Token::Ident if self.terse && TERSE_KEYWORDS.contains(&text) => "keyword",
            Token::Ident if TermKind::from_name(text).is_some() => "term",
            Token::Ident if next == Some(Token::LParen) => "function",
            _ => "",
        }
    }
}

impl reedline::Highlighter for Highlighter {
    fn highlight(&self, line: &str, _: usize) -> StyledText {
        let mut output = StyledText::new();

        let tokens: Vec<_> = Token::lexer(line).spanned().collect();
        for (i, (token, span)) in tokens.iter().enumerate() {
            let text = &line[span.clone()];
            let name = match token {
                Ok(token) => {
                    let next = tokens.get(i + 1).and_then(|(next, _)| next.ok());
                    self.classify(*token, text, next)
                }
                Err(_) => "invalid",
            };
            output.push((Style::new().fg(color(name)), text.to_string()));
        }

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reedline::Highlighter as _;

    fn colors_of(highlighter: &Highlighter, line: &str) -> Vec<(String, Color)> {
        highlighter
            .highlight(line, 0)
            .buffer
            .into_iter()
            .filter(|(_, text)| !text.trim().is_empty())
            .map(|(style, text)| (text, style.foreground.unwrap_or(Color::White)))
            .collect()
    }

    #[test]
    fn test_keeps_every_character() {
        let line = "r.table('bikes') // all\n  .count() @";
        let styled = Highlighter::new(false).highlight(line, 0);
        let text: String = styled.buffer.iter().map(|(_, text)| text.as_str()).collect();
        assert_eq!(text, line);
    }

    #[test]
    fn test_token_colors() {
        let colors = colors_of(&Highlighter::new(false), "let n = f(1, 'a') // c");
        assert_eq!(
            colors,
            vec![
                ("let".to_string(), Color::Magenta),
                ("n".to_string(), Color::White),
                ("=".to_string(), Color::White),
                ("f".to_string(), Color::Blue),
                ("(".to_string(), Color::White),
                ("1".to_string(), Color::Cyan),
                (",".to_string(), Color::White),
                ("'a'".to_string(), Color::Green),
                (")".to_string(), Color::White),
                ("// c".to_string(), Color::DarkGray),
            ]
        );
    }

    #[test]
    fn test_terse_keywords_only_when_enabled() {
        let standard = colors_of(&Highlighter::new(false), "x is y # note");
        assert_eq!(standard[1], ("is".to_string(), Color::White));
        assert_eq!(standard[3], ("# note".to_string(), Color::Red));

        let terse = colors_of(&Highlighter::new(true), "x is y # note");
        assert_eq!(terse[1], ("is".to_string(), Color::Magenta));
        assert_eq!(terse[3], ("# note".to_string(), Color::DarkGray));
    }

    #[test]
    fn test_query_terms() {
        let colors = colors_of(&Highlighter::new(false), "r.table");
        assert_eq!(colors[2], ("table".to_string(), Color::Yellow));
    }
}
