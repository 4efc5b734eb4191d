//! # Documento e Spans de Entidade
//!
//! O [`Doc`] é a unidade que atravessa o pipeline: o texto original, seus
//! tokens e a lista de entidades já atribuídas. A lista de entidades é sempre
//! ordenada e **sem sobreposição**; qualquer tentativa de gravar spans que se
//! cruzam é rejeitada.

use serde::{Deserialize, Serialize};

use crate::error::{Result, RulerError};
use crate::tokenizer::{tokenize, tokens_from_words, Token};

/// Um span (intervalo) de tokens com uma label associada.
///
/// # Exemplo
/// Em "I live in New York", o span "New York":
/// `Span { start: 3, end: 5, label: "GPE", ent_id: None }`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    /// Índice do token inicial (inclusivo)
    pub start: usize,
    /// Índice do token final (exclusivo)
    pub end: usize,
    /// Rótulo da entidade (ex: "ORG", "GPE")
    pub label: String,
    /// Identificador opcional do padrão que gerou a entidade
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ent_id: Option<String>,
}

impl Span {
    pub fn new(start: usize, end: usize, label: impl Into<String>) -> Self {
        Self { start, end, label: label.into(), ent_id: None }
    }

    pub fn with_id(mut self, ent_id: impl Into<String>) -> Self {
        self.ent_id = Some(ent_id.into());
        self
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// Dois spans se sobrepõem se compartilham pelo menos um token.
    pub fn overlaps(&self, start: usize, end: usize) -> bool {
        self.start < end && start < self.end
    }
}

/// Entidade pronta para exibição: texto e offsets no texto original.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySpan {
    /// Texto da entidade (ex: "Joe Biden")
    pub text: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ent_id: Option<String>,
    /// Índice do primeiro token
    pub start_token: usize,
    /// Índice do token seguinte ao último (exclusivo)
    pub end_token: usize,
    /// Posição de byte inicial no texto original
    pub start: usize,
    /// Posição de byte final no texto original
    pub end: usize,
}

/// Documento tokenizado com suas entidades.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Doc {
    text: String,
    tokens: Vec<Token>,
    ents: Vec<Span>,
}

impl Doc {
    /// Tokeniza o texto e cria um documento sem entidades.
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let tokens = tokenize(&text);
        Self { text, tokens, ents: Vec::new() }
    }

    /// Cria um documento a partir de palavras já segmentadas.
    pub fn from_words<S: AsRef<str>>(words: &[S]) -> Self {
        let (text, tokens) = tokens_from_words(words);
        Self { text, tokens, ents: Vec::new() }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Texto original coberto pelos tokens `start..end`.
    pub fn span_text(&self, start: usize, end: usize) -> &str {
        if start >= end || end > self.tokens.len() {
            return "";
        }
        &self.text[self.tokens[start].start..self.tokens[end - 1].end]
    }

    pub fn ents(&self) -> &[Span] {
        &self.ents
    }

    /// Entidades com texto e offsets de byte.
    pub fn entity_spans(&self) -> Vec<EntitySpan> {
        self.ents
            .iter()
            .map(|span| EntitySpan {
                text: self.span_text(span.start, span.end).to_string(),
                label: span.label.clone(),
                ent_id: span.ent_id.clone(),
                start_token: span.start,
                end_token: span.end,
                start: self.tokens[span.start].start,
                end: self.tokens[span.end - 1].end,
            })
            .collect()
    }

    /// Substitui as entidades do documento.
    ///
    /// Os spans são ordenados por posição. Spans vazios, fora dos limites ou
    /// que se sobrepõem fazem a operação falhar sem alterar o documento.
    pub fn set_ents(&mut self, mut spans: Vec<Span>) -> Result<()> {
        for span in &spans {
            if span.is_empty() || span.end > self.tokens.len() {
                return Err(RulerError::InvalidSpan(format!(
                    "{}..{} ({}) em documento com {} tokens",
                    span.start,
                    span.end,
                    span.label,
                    self.tokens.len()
                )));
            }
        }
        spans.sort_by_key(|s| (s.start, s.end));
        for pair in spans.windows(2) {
            if pair[1].start < pair[0].end {
                return Err(RulerError::entity_conflict(format!(
                    "'{}' ({}..{}, {}) sobrepõe '{}' ({}..{}, {})",
                    self.span_text(pair[1].start, pair[1].end),
                    pair[1].start,
                    pair[1].end,
                    pair[1].label,
                    self.span_text(pair[0].start, pair[0].end),
                    pair[0].start,
                    pair[0].end,
                    pair[0].label,
                )));
            }
        }
        self.ents = spans;
        Ok(())
    }

    /// Marca (ou desmarca) o token `i` como início de sentença.
    pub fn set_sent_start(&mut self, i: usize, value: bool) -> Result<()> {
        let len = self.tokens.len();
        let token = self
            .tokens
            .get_mut(i)
            .ok_or_else(|| RulerError::InvalidSpan(format!("token {i} fora do documento com {len} tokens")))?;
        token.is_sent_start = value;
        Ok(())
    }

    /// Tags IOB de cada token (`B-LABEL`, `I-LABEL` ou `O`).
    pub fn iob_tags(&self) -> Vec<String> {
        let mut tags = vec!["O".to_string(); self.tokens.len()];
        for span in &self.ents {
            tags[span.start] = format!("B-{}", span.label);
            for tag in &mut tags[span.start + 1..span.end] {
                *tag = format!("I-{}", span.label);
            }
        }
        tags
    }

    /// Re-tokeniza o documento para que cada entidade vire um único token.
    ///
    /// Os offsets originais são preservados; a quantidade de entidades também.
    pub fn merge_entities(&mut self) {
        if self.ents.is_empty() {
            return;
        }

        let mut merged = Vec::with_capacity(self.tokens.len());
        let mut new_ents = Vec::with_capacity(self.ents.len());
        let mut ents = self.ents.iter().peekable();
        let mut i = 0;

        while i < self.tokens.len() {
            match ents.peek() {
                Some(span) if span.start == i => {
                    let first = &self.tokens[span.start];
                    let last = &self.tokens[span.end - 1];
                    let mut token = Token::new(&self.text[first.start..last.end], first.start, last.end, first.idx);
                    token.whitespace = last.whitespace;
                    token.is_sent_start = first.is_sent_start;
                    token.index = merged.len();
                    new_ents.push(Span {
                        start: merged.len(),
                        end: merged.len() + 1,
                        label: span.label.clone(),
                        ent_id: span.ent_id.clone(),
                    });
                    merged.push(token);
                    i = span.end;
                    ents.next();
                }
                _ => {
                    let mut token = self.tokens[i].clone();
                    token.index = merged.len();
                    merged.push(token);
                    i += 1;
                }
            }
        }

        self.tokens = merged;
        self.ents = new_ents;
    }
}
