//! # Phrase Matcher
//!
//! Encontra frases literais de múltiplos tokens. Cada frase é tokenizada no
//! momento do registro e guardada como a sequência de valores de um atributo
//! (`ORTH` por padrão; `LOWER` para comparação sem caixa). A busca compara
//! janelas contíguas do documento com um índice `valores → frases`.

use std::collections::BTreeSet;

use rustc_hash::FxHashMap;

use crate::attrs::{Attr, AttrKind};
use crate::error::{Result, RulerError};
use crate::matcher::Match;
use crate::tokenizer::{tokenize, Token};

#[derive(Debug, Clone)]
struct PhraseEntry {
    key: String,
    order: usize,
}

/// Matcher de frases literais.
#[derive(Debug, Clone)]
pub struct PhraseMatcher {
    attr: Attr,
    index: FxHashMap<Vec<String>, Vec<PhraseEntry>>,
    lengths: BTreeSet<usize>,
    count: usize,
}

impl PhraseMatcher {
    /// Cria um matcher que compara o atributo `attr` (deve ser textual).
    pub fn new(attr: Attr) -> Result<Self> {
        if attr.kind() != AttrKind::Str {
            return Err(RulerError::InvalidConfig(format!(
                "phrase_matcher_attr deve ser um atributo textual, recebido {attr}"
            )));
        }
        Ok(Self {
            attr,
            index: FxHashMap::default(),
            lengths: BTreeSet::new(),
            count: 0,
        })
    }

    pub fn attr(&self) -> Attr {
        self.attr
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn clear(&mut self) {
        self.index.clear();
        self.lengths.clear();
        self.count = 0;
    }

    /// Sequência de valores de atributo de uma frase, pronta para o índice.
    pub fn phrase_key(&self, phrase: &str) -> Result<Vec<String>> {
        let key: Vec<String> = tokenize(phrase).iter().map(|t| self.attr.get_str(t)).collect();
        if key.is_empty() {
            return Err(RulerError::invalid_pattern(format!("frase sem tokens: {phrase:?}")));
        }
        Ok(key)
    }

    /// Registra uma frase já convertida por [`phrase_key`](Self::phrase_key).
    pub fn add(&mut self, key: impl Into<String>, order: usize, phrase_key: Vec<String>) {
        self.lengths.insert(phrase_key.len());
        self.index.entry(phrase_key).or_default().push(PhraseEntry {
            key: key.into(),
            order,
        });
        self.count += 1;
    }

    /// Todos os matches contíguos, por posição inicial e comprimento.
    pub fn find_matches(&self, tokens: &[Token]) -> Vec<Match> {
        if self.count == 0 {
            return Vec::new();
        }
        let values: Vec<String> = tokens.iter().map(|t| self.attr.get_str(t)).collect();
        let mut matches = Vec::new();

        for start in 0..values.len() {
            for &len in &self.lengths {
                let end = start + len;
                if end > values.len() {
                    break;
                }
                if let Some(entries) = self.index.get(&values[start..end]) {
                    matches.extend(entries.iter().map(|entry| Match {
                        key: entry.key.clone(),
                        start,
                        end,
                        order: entry.order,
                    }));
                }
            }
        }
        matches
    }
}

impl Default for PhraseMatcher {
    fn default() -> Self {
        Self {
            attr: Attr::Orth,
            index: FxHashMap::default(),
            lengths: BTreeSet::new(),
            count: 0,
        }
    }
}
