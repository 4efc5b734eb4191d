//! # Tokenizador
//!
//! Divide o texto bruto em tokens (palavras e pontuações). Cada token guarda
//! sua posição no texto original de duas formas:
//!
//! - `start` / `end`: offsets em **bytes** (para fatiar a `String` original);
//! - `idx`: offset em **caracteres** (o que o usuário vê, independente de UTF-8).
//!
//! ## Esquema
//!
//! - Espaços separam tokens e não geram tokens.
//! - Letras, dígitos, hífens internos e apóstrofos formam palavras
//!   (`"previously-announced"`, `"Inc's"`).
//! - O ponto fica na palavra quando ela é uma abreviação conhecida (`"Dr."`)
//!   ou quando separa dígitos (`"1.234"`).
//! - Qualquer outro símbolo vira um token próprio.
//!
//! ```rust
//! use ruler_core::tokenizer::tokenize;
//!
//! let tokens = tokenize("Re tsogile sentle, wêna o tsogile jang?");
//! let idx: Vec<usize> = tokens.iter().map(|t| t.idx).collect();
//! assert_eq!(idx, vec![0, 3, 11, 17, 19, 24, 26, 34, 38]);
//! ```

use serde::{Deserialize, Serialize};

/// Um token extraído do texto original.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Token {
    /// O texto do token (ex: "Apple", ",", "bye").
    pub text: String,
    /// Texto normalizado em minúsculas.
    pub lower: String,
    /// Índice de byte inicial no texto original (inclusive).
    pub start: usize,
    /// Índice de byte final no texto original (exclusivo).
    pub end: usize,
    /// Offset em caracteres no texto original.
    pub idx: usize,
    /// Índice sequencial do token na lista (0, 1, 2...).
    pub index: usize,
    /// Se o token é seguido por espaço em branco.
    pub whitespace: bool,
    /// Se o token inicia uma sentença.
    pub is_sent_start: bool,
}

impl Token {
    pub fn new(text: impl Into<String>, start: usize, end: usize, idx: usize) -> Self {
        let text = text.into();
        Self {
            lower: text.to_lowercase(),
            text,
            start,
            end,
            idx,
            index: 0,
            whitespace: false,
            is_sent_start: false,
        }
    }

    /// Quantidade de caracteres do token.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// Abreviações cujo ponto final pertence ao token
const ABBREVIATIONS: &[&str] = &[
    "Dr", "Dra", "Sr", "Sra", "Prof", "Profa", "Gov", "Dep", "Sen", "Min",
    "Gen", "Cap", "Sgt", "Cel", "Adm", "Pres", "Eng", "Mr", "Mrs", "Ms",
    "Jr", "St", "Inc", "Ltd", "Co", "Corp", "Bros", "vs", "etc", "km",
    "kg", "mg", "ml", "art", "pág", "cap", "tel", "av",
];

/// Tokens que encerram uma sentença
const SENTENCE_END: &[&str] = &[".", "!", "?"];

/// Tokeniza um texto.
pub fn tokenize(text: &str) -> Vec<Token> {
    let mut tokens = tokenize_standard(text);
    finalize(text, &mut tokens);
    tokens
}

/// Monta tokens a partir de palavras já segmentadas, separadas por um espaço.
///
/// Retorna o texto reconstruído junto com os tokens.
pub fn tokens_from_words<S: AsRef<str>>(words: &[S]) -> (String, Vec<Token>) {
    let mut text = String::new();
    let mut tokens = Vec::with_capacity(words.len());
    let mut char_pos = 0;

    for (i, word) in words.iter().enumerate() {
        let word = word.as_ref();
        if i > 0 {
            text.push(' ');
            char_pos += 1;
        }
        let start = text.len();
        text.push_str(word);
        tokens.push(Token::new(word, start, text.len(), char_pos));
        char_pos += word.chars().count();
    }

    finalize(&text, &mut tokens);
    (text, tokens)
}

/// Re-indexa e preenche os atributos que dependem da vizinhança
fn finalize(text: &str, tokens: &mut [Token]) {
    let mut prev_ends_sentence = true;
    for (i, token) in tokens.iter_mut().enumerate() {
        token.index = i;
        token.whitespace = text[token.end..].starts_with(char::is_whitespace);
        token.is_sent_start = prev_ends_sentence;
        prev_ends_sentence = SENTENCE_END.contains(&token.text.as_str());
    }
}

fn tokenize_standard(text: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut current_start = 0;
    let mut current_idx = 0;
    let mut current_text = String::new();
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let mut i = 0;

    while i < chars.len() {
        let (byte_pos, ch) = chars[i];

        if ch.is_alphanumeric() || ch == '-' && !current_text.is_empty() {
            if current_text.is_empty() {
                current_start = byte_pos;
                current_idx = i;
            }
            current_text.push(ch);
        } else if ch == '.' && !current_text.is_empty() {
            let is_abbrev = ABBREVIATIONS.contains(&current_text.as_str());
            let current_is_num = current_text.chars().all(char::is_numeric);
            let next_is_num = chars
                .get(i + 1)
                .map(|(_, c)| c.is_numeric())
                .unwrap_or(false);

            if is_abbrev || (current_is_num && next_is_num) {
                current_text.push('.');
            } else {
                flush_token(&mut tokens, &mut current_text, current_start, byte_pos, current_idx);
                tokens.push(Token::new(".", byte_pos, byte_pos + 1, i));
            }
        } else if (ch == '\'' || ch == '\u{2019}') && !current_text.is_empty() {
            current_text.push(ch);
        } else if ch.is_whitespace() {
            flush_token(&mut tokens, &mut current_text, current_start, byte_pos, current_idx);
        } else {
            flush_token(&mut tokens, &mut current_text, current_start, byte_pos, current_idx);
            tokens.push(Token::new(ch.to_string(), byte_pos, byte_pos + ch.len_utf8(), i));
        }
        i += 1;
    }

    flush_token(&mut tokens, &mut current_text, current_start, text.len(), current_idx);

    tokens
}

/// Fecha o token acumulado e adiciona à lista (se não vazio)
fn flush_token(tokens: &mut Vec<Token>, text: &mut String, start: usize, end: usize, idx: usize) {
    if !text.is_empty() {
        tokens.push(Token::new(text.as_str(), start, end, idx));
        text.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_basic() {
        let tokens = tokenize("hello world bye bye");
        let texts: Vec<&str> = tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["hello", "world", "bye", "bye"]);
        assert_eq!(tokens[3].index, 3);
        assert!(tokens[0].whitespace);
        assert!(!tokens[3].whitespace);
    }

    #[test]
    fn test_char_offsets_with_multibyte_text() {
        // "Estamos bem, e você?" em setsuana
        let text = "Re tsogile sentle, wêna o tsogile jang?";
        let tokens = tokenize(text);
        let idx: Vec<usize> = tokens.iter().map(|t| t.idx).collect();
        assert_eq!(idx, vec![0, 3, 11, 17, 19, 24, 26, 34, 38]);
        // idx conta caracteres, start conta bytes
        assert_eq!(tokens[5].text, "o");
        assert!(tokens[5].start > tokens[5].idx);
        for token in &tokens {
            assert_eq!(&text[token.start..token.end], token.text);
        }
    }

    #[test]
    fn test_abbreviation_and_apostrophe() {
        let tokens = tokenize("Sen. Bernie Sanders and Rotan Mosle Inc's unit.");
        let texts: Vec<&str> = tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(
            texts,
            vec!["Sen.", "Bernie", "Sanders", "and", "Rotan", "Mosle", "Inc's", "unit", "."]
        );
    }

    #[test]
    fn test_lower_and_sentence_starts() {
        let tokens = tokenize("I live here. New York!");
        assert_eq!(tokens[2].lower, "here");
        assert!(tokens[0].is_sent_start);
        assert!(!tokens[1].is_sent_start);
        assert!(tokens[4].is_sent_start);
        assert_eq!(tokens[4].lower, "new");
        assert!(!tokens[5].is_sent_start);
    }

    #[test]
    fn test_tokens_from_words() {
        let (text, tokens) = tokens_from_words(&["I", "live", "in", "New", "York"]);
        assert_eq!(text, "I live in New York");
        assert_eq!(tokens[3].idx, 10);
        assert_eq!(&text[tokens[4].start..tokens[4].end], "York");
    }
}
