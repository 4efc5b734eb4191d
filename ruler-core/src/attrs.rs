//! # Atributos de Token
//!
//! Os padrões do ruler restringem tokens por atributos (`ORTH`, `LOWER`,
//! `IS_DIGIT`...). Este módulo define o conjunto reconhecido e como cada
//! atributo é calculado a partir de um [`Token`].
//!
//! Há três famílias de valores:
//! - **texto**: `ORTH`/`TEXT`, `LOWER`, `NORM`, `SHAPE`, `PREFIX`, `SUFFIX`;
//! - **inteiro**: `LENGTH` (em caracteres);
//! - **booleano**: `IS_*`, `LIKE_NUM`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::RulerError;
use crate::tokenizer::Token;

/// Atributo de token reconhecido pelos matchers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Attr {
    Orth,
    Text,
    Lower,
    Norm,
    Shape,
    Prefix,
    Suffix,
    Length,
    IsAlpha,
    IsAscii,
    IsDigit,
    IsLower,
    IsUpper,
    IsTitle,
    IsPunct,
    IsSpace,
    LikeNum,
    IsSentStart,
}

/// Valor de um atributo para um token concreto.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Str(String),
    Int(i64),
    Bool(bool),
}

/// Família de valor esperada por um atributo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrKind {
    Str,
    Int,
    Bool,
}

const ALL: [Attr; 18] = [
    Attr::Orth,
    Attr::Text,
    Attr::Lower,
    Attr::Norm,
    Attr::Shape,
    Attr::Prefix,
    Attr::Suffix,
    Attr::Length,
    Attr::IsAlpha,
    Attr::IsAscii,
    Attr::IsDigit,
    Attr::IsLower,
    Attr::IsUpper,
    Attr::IsTitle,
    Attr::IsPunct,
    Attr::IsSpace,
    Attr::LikeNum,
    Attr::IsSentStart,
];

const NUMBER_WORDS: &[&str] = &[
    "zero", "one", "two", "three", "four", "five", "six", "seven", "eight", "nine", "ten",
    "eleven", "twelve", "hundred", "thousand", "million", "billion",
    "um", "dois", "três", "quatro", "cinco", "seis", "sete", "oito", "nove", "dez",
    "cem", "mil", "milhão", "bilhão",
];

impl Attr {
    pub fn all() -> &'static [Attr] {
        &ALL
    }

    /// Nome canônico usado nos padrões JSON.
    pub fn name(&self) -> &'static str {
        match self {
            Attr::Orth => "ORTH",
            Attr::Text => "TEXT",
            Attr::Lower => "LOWER",
            Attr::Norm => "NORM",
            Attr::Shape => "SHAPE",
            Attr::Prefix => "PREFIX",
            Attr::Suffix => "SUFFIX",
            Attr::Length => "LENGTH",
            Attr::IsAlpha => "IS_ALPHA",
            Attr::IsAscii => "IS_ASCII",
            Attr::IsDigit => "IS_DIGIT",
            Attr::IsLower => "IS_LOWER",
            Attr::IsUpper => "IS_UPPER",
            Attr::IsTitle => "IS_TITLE",
            Attr::IsPunct => "IS_PUNCT",
            Attr::IsSpace => "IS_SPACE",
            Attr::LikeNum => "LIKE_NUM",
            Attr::IsSentStart => "IS_SENT_START",
        }
    }

    pub fn kind(&self) -> AttrKind {
        match self {
            Attr::Orth | Attr::Text | Attr::Lower | Attr::Norm | Attr::Shape | Attr::Prefix | Attr::Suffix => {
                AttrKind::Str
            }
            Attr::Length => AttrKind::Int,
            _ => AttrKind::Bool,
        }
    }

    /// Calcula o valor do atributo para o token.
    pub fn get(&self, token: &Token) -> AttrValue {
        match self.kind() {
            AttrKind::Str => AttrValue::Str(self.get_str(token)),
            AttrKind::Int => AttrValue::Int(token.char_len() as i64),
            AttrKind::Bool => AttrValue::Bool(self.get_bool(token)),
        }
    }

    /// Valor textual do atributo; atributos não textuais viram sua representação em texto.
    pub fn get_str(&self, token: &Token) -> String {
        let word = &token.text;
        match self {
            Attr::Orth | Attr::Text => word.clone(),
            Attr::Lower | Attr::Norm => token.lower.clone(),
            Attr::Shape => word_shape(word),
            Attr::Prefix => word.chars().take(1).collect(),
            Attr::Suffix => {
                let chars: Vec<char> = word.chars().collect();
                chars[chars.len().saturating_sub(3)..].iter().collect()
            }
            Attr::Length => token.char_len().to_string(),
            _ => self.get_bool(token).to_string(),
        }
    }

    fn get_bool(&self, token: &Token) -> bool {
        let word = token.text.as_str();
        let non_empty = !word.is_empty();
        match self {
            Attr::IsAlpha => non_empty && word.chars().all(char::is_alphabetic),
            Attr::IsAscii => word.is_ascii(),
            Attr::IsDigit => non_empty && word.chars().all(|c| c.is_ascii_digit()),
            Attr::IsLower => {
                word.chars().any(char::is_alphabetic)
                    && word.chars().filter(|c| c.is_alphabetic()).all(char::is_lowercase)
            }
            Attr::IsUpper => {
                word.chars().any(char::is_alphabetic)
                    && word.chars().filter(|c| c.is_alphabetic()).all(char::is_uppercase)
            }
            Attr::IsTitle => {
                let mut chars = word.chars();
                chars.next().map(char::is_uppercase).unwrap_or(false)
                    && chars.filter(|c| c.is_alphabetic()).all(char::is_lowercase)
            }
            Attr::IsPunct => {
                non_empty && word.chars().all(|c| !c.is_alphanumeric() && !c.is_whitespace())
            }
            Attr::IsSpace => non_empty && word.chars().all(char::is_whitespace),
            Attr::LikeNum => like_num(&token.lower),
            Attr::IsSentStart => token.is_sent_start,
            _ => false,
        }
    }
}

impl fmt::Display for Attr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Attr {
    type Err = RulerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ALL.iter()
            .copied()
            .find(|attr| attr.name() == s)
            .ok_or_else(|| RulerError::invalid_pattern(format!("atributo desconhecido '{s}'")))
    }
}

/// Forma da palavra: maiúsculas → `X`, minúsculas → `x`, dígitos → `d`.
/// Sequências iguais param em 4 caracteres ("Rotterdam" → "Xxxxx").
pub fn word_shape(word: &str) -> String {
    let mut shape = String::new();
    let mut last: Option<char> = None;
    let mut run = 0;
    for c in word.chars() {
        let s = if c.is_alphabetic() {
            if c.is_uppercase() { 'X' } else { 'x' }
        } else if c.is_numeric() {
            'd'
        } else {
            c
        };
        if Some(s) == last {
            run += 1;
        } else {
            run = 1;
            last = Some(s);
        }
        if run <= 4 {
            shape.push(s);
        }
    }
    shape
}

fn like_num(lower: &str) -> bool {
    let cleaned: String = lower
        .trim_start_matches(['+', '-', '±', '~'])
        .chars()
        .filter(|c| *c != ',' && *c != '.')
        .collect();
    if !cleaned.is_empty() && cleaned.chars().all(|c| c.is_ascii_digit()) {
        return true;
    }
    if let Some((num, denom)) = cleaned.split_once('/') {
        if !num.is_empty()
            && !denom.is_empty()
            && num.chars().all(|c| c.is_ascii_digit())
            && denom.chars().all(|c| c.is_ascii_digit())
        {
            return true;
        }
    }
    NUMBER_WORDS.contains(&lower)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::tokenize;

    #[test]
    fn test_attr_names_round_trip() {
        for attr in Attr::all() {
            assert_eq!(attr.name().parse::<Attr>().unwrap(), *attr);
        }
        assert!("ASDF".parse::<Attr>().is_err());
    }

    #[test]
    fn test_string_attrs() {
        let tokens = tokenize("Apple 2024");
        assert_eq!(Attr::Orth.get_str(&tokens[0]), "Apple");
        assert_eq!(Attr::Lower.get_str(&tokens[0]), "apple");
        assert_eq!(Attr::Shape.get_str(&tokens[0]), "Xxxxx");
        assert_eq!(Attr::Shape.get_str(&tokens[1]), "dddd");
        assert_eq!(Attr::Prefix.get_str(&tokens[0]), "A");
        assert_eq!(Attr::Suffix.get_str(&tokens[0]), "ple");
        assert_eq!(Attr::Length.get(&tokens[0]), AttrValue::Int(5));
    }

    #[test]
    fn test_word_shape_truncates_runs() {
        assert_eq!(word_shape("Rotterdam"), "Xxxxx");
        assert_eq!(word_shape("C3PO"), "XdXX");
        assert_eq!(word_shape("12.345"), "dd.ddd");
    }

    #[test]
    fn test_boolean_attrs() {
        let tokens = tokenize("HELLO Hello hello 42 , ten");
        assert_eq!(Attr::IsUpper.get(&tokens[0]), AttrValue::Bool(true));
        assert_eq!(Attr::IsTitle.get(&tokens[1]), AttrValue::Bool(true));
        assert_eq!(Attr::IsTitle.get(&tokens[0]), AttrValue::Bool(false));
        assert_eq!(Attr::IsLower.get(&tokens[2]), AttrValue::Bool(true));
        assert_eq!(Attr::IsDigit.get(&tokens[3]), AttrValue::Bool(true));
        assert_eq!(Attr::IsPunct.get(&tokens[4]), AttrValue::Bool(true));
        assert_eq!(Attr::LikeNum.get(&tokens[5]), AttrValue::Bool(true));
        assert_eq!(Attr::LikeNum.get(&tokens[2]), AttrValue::Bool(false));
        assert_eq!(Attr::IsSentStart.get(&tokens[0]), AttrValue::Bool(true));
    }
}
