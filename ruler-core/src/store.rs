//! # Armazenamento de Padrões
//!
//! Guarda os padrões do ruler na ordem em que foram adicionados e mantém os
//! dois matchers (tokens e frases) sincronizados com essa lista.
//!
//! Cada padrão é registrado sob uma **chave**: a própria label, ou
//! `label + sep + id` quando o padrão tem id. Para as chaves com id, um mapa
//! `hash(chave) → (label, id)` permite recuperar os dois campos quando o
//! match é convertido em entidade.

use std::collections::BTreeMap;
use std::hash::Hasher;

use rustc_hash::{FxHashMap, FxHashSet, FxHasher};
use tracing::debug;

use crate::attrs::Attr;
use crate::error::{Result, RulerError};
use crate::matcher::{Match, TokenMatcher};
use crate::pattern::{compile_token_pattern, EntityPattern, PatternKind, TokenConstraint, TokenSpec};
use crate::phrase_matcher::PhraseMatcher;
use crate::tokenizer::Token;

/// Hash estável (entre execuções) de uma chave de padrão.
pub fn key_hash(key: &str) -> u64 {
    let mut hasher = FxHasher::default();
    hasher.write(key.as_bytes());
    hasher.finish()
}

/// Padrão já compilado, aguardando a inserção.
enum Compiled {
    Phrase(Vec<String>),
    Tokens(Vec<TokenConstraint>),
}

/// Padrões do ruler e seus matchers.
#[derive(Debug, Clone)]
pub struct PatternStore {
    ent_id_sep: String,
    entries: Vec<EntityPattern>,
    seen: FxHashSet<String>,
    ent_ids: FxHashMap<u64, (String, String)>,
    token_matcher: TokenMatcher,
    phrase_matcher: PhraseMatcher,
}

impl PatternStore {
    pub fn new(ent_id_sep: impl Into<String>, phrase_attr: Attr) -> Result<Self> {
        let ent_id_sep = ent_id_sep.into();
        if ent_id_sep.is_empty() {
            return Err(RulerError::InvalidConfig("ent_id_sep não pode ser vazio".into()));
        }
        Ok(Self {
            ent_id_sep,
            entries: Vec::new(),
            seen: FxHashSet::default(),
            ent_ids: FxHashMap::default(),
            token_matcher: TokenMatcher::new(),
            phrase_matcher: PhraseMatcher::new(phrase_attr)?,
        })
    }

    pub fn ent_id_sep(&self) -> &str {
        &self.ent_id_sep
    }

    pub fn phrase_attr(&self) -> Attr {
        self.phrase_matcher.attr()
    }

    /// Chave sob a qual um padrão é registrado.
    pub fn create_key(&self, label: &str, id: Option<&str>) -> String {
        match id {
            Some(id) => format!("{label}{}{id}", self.ent_id_sep),
            None => label.to_string(),
        }
    }

    /// Recupera `(label, id)` de uma chave registrada.
    pub fn decode_key(&self, key: &str) -> (String, Option<String>) {
        match self.ent_ids.get(&key_hash(key)) {
            Some((label, id)) => (label.clone(), Some(id.clone())),
            None => (key.to_string(), None),
        }
    }

    /// Adiciona um lote de padrões.
    ///
    /// O lote inteiro é compilado antes de qualquer inserção: se algum padrão
    /// for inválido nada é armazenado. Padrões idênticos a um já presente são
    /// ignorados. Devolve quantos padrões novos entraram.
    pub fn add_patterns(&mut self, patterns: Vec<EntityPattern>, validate: bool) -> Result<usize> {
        let mut staged = Vec::with_capacity(patterns.len());
        let mut batch_seen = FxHashSet::default();
        let mut errors = Vec::new();

        for (i, pattern) in patterns.into_iter().enumerate() {
            let fingerprint = serde_json::to_string(&pattern)?;
            if self.seen.contains(&fingerprint) || !batch_seen.insert(fingerprint.clone()) {
                continue;
            }
            if pattern.label.is_empty() {
                errors.push(format!("padrão {i}: label vazia"));
                continue;
            }
            let compiled = match &pattern.pattern {
                PatternKind::Phrase(phrase) => match self.phrase_matcher.phrase_key(phrase) {
                    Ok(key) => Compiled::Phrase(key),
                    Err(err) => {
                        errors.push(format!("padrão {i} ({}): {err}", pattern.label));
                        continue;
                    }
                },
                PatternKind::Tokens(specs) => match compile_token_pattern(specs) {
                    Ok(constraints) => Compiled::Tokens(constraints),
                    Err(problems) => {
                        errors.extend(problems.into_iter().map(|p| format!("padrão {i} ({}): {p}", pattern.label)));
                        continue;
                    }
                },
            };
            staged.push((fingerprint, pattern, compiled));
        }

        if !errors.is_empty() {
            return Err(if validate {
                RulerError::PatternValidation { errors }
            } else {
                RulerError::InvalidPattern(errors.swap_remove(0))
            });
        }

        let added = staged.len();
        for (fingerprint, pattern, compiled) in staged {
            let key = self.create_key(&pattern.label, pattern.id.as_deref());
            if let Some(id) = &pattern.id {
                self.ent_ids
                    .insert(key_hash(&key), (pattern.label.clone(), id.clone()));
            }
            let order = self.entries.len();
            match compiled {
                Compiled::Phrase(phrase_key) => self.phrase_matcher.add(key, order, phrase_key),
                Compiled::Tokens(constraints) => self.token_matcher.add(key, order, constraints),
            }
            self.seen.insert(fingerprint);
            self.entries.push(pattern);
        }

        debug!(added, total = self.entries.len(), "padrões adicionados");
        Ok(added)
    }

    /// Labels distintas, na ordem em que apareceram.
    pub fn labels(&self) -> Vec<String> {
        let mut seen = FxHashSet::default();
        self.entries
            .iter()
            .filter(|p| seen.insert(p.label.as_str()))
            .map(|p| p.label.clone())
            .collect()
    }

    /// Ids distintos, na ordem em que apareceram.
    pub fn ent_ids(&self) -> Vec<String> {
        let mut seen = FxHashSet::default();
        self.entries
            .iter()
            .filter_map(|p| p.id.as_deref())
            .filter(|id| seen.insert(*id))
            .map(str::to_string)
            .collect()
    }

    pub fn ent_id_map(&self) -> &FxHashMap<u64, (String, String)> {
        &self.ent_ids
    }

    /// Há algum padrão com esta label (ou chave `label + sep + id`)?
    pub fn contains(&self, label: &str) -> bool {
        self.entries.iter().any(|p| {
            p.label == label || self.create_key(&p.label, p.id.as_deref()) == label
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.seen.clear();
        self.ent_ids.clear();
        self.token_matcher.clear();
        self.phrase_matcher.clear();
    }

    pub fn patterns(&self) -> &[EntityPattern] {
        &self.entries
    }

    /// Frases agrupadas por chave.
    pub fn phrase_patterns(&self) -> BTreeMap<String, Vec<String>> {
        let mut out: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for p in &self.entries {
            if let PatternKind::Phrase(phrase) = &p.pattern {
                out.entry(self.create_key(&p.label, p.id.as_deref()))
                    .or_default()
                    .push(phrase.clone());
            }
        }
        out
    }

    /// Padrões de tokens agrupados por chave.
    pub fn token_patterns(&self) -> BTreeMap<String, Vec<Vec<TokenSpec>>> {
        let mut out: BTreeMap<String, Vec<Vec<TokenSpec>>> = BTreeMap::new();
        for p in &self.entries {
            if let PatternKind::Tokens(specs) = &p.pattern {
                out.entry(self.create_key(&p.label, p.id.as_deref()))
                    .or_default()
                    .push(specs.clone());
            }
        }
        out
    }

    /// Matches brutos: primeiro os de tokens, depois os de frases.
    pub fn find_matches(&self, tokens: &[Token]) -> Vec<Match> {
        let mut matches = self.token_matcher.find_matches(tokens);
        matches.extend(self.phrase_matcher.find_matches(tokens));
        matches
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store() -> PatternStore {
        PatternStore::new("||", Attr::Orth).unwrap()
    }

    #[test]
    fn test_keys_and_ent_id_map() {
        let mut s = store();
        s.add_patterns(
            vec![
                EntityPattern::phrase("TECH_ORG", "Apple").with_id("a1"),
                EntityPattern::phrase("TECH_ORG", "Microsoft").with_id("a1"),
                EntityPattern::phrase("HELLO", "hello world"),
            ],
            false,
        )
        .unwrap();

        assert_eq!(s.len(), 3);
        assert_eq!(s.ent_id_map().len(), 1);
        assert_eq!(s.decode_key("TECH_ORG||a1"), ("TECH_ORG".into(), Some("a1".into())));
        assert_eq!(s.decode_key("HELLO"), ("HELLO".into(), None));
        assert!(s.contains("TECH_ORG"));
        assert!(s.contains("TECH_ORG||a1"));
        assert!(!s.contains("a1"));
        assert_eq!(s.phrase_patterns()["TECH_ORG||a1"], vec!["Apple", "Microsoft"]);
    }

    #[test]
    fn test_add_is_idempotent() {
        let mut s = store();
        let patterns = vec![
            EntityPattern::phrase("HELLO", "hello world"),
            EntityPattern::tokens("BYE", json!([{"LOWER": "bye"}, {"LOWER": "bye"}])).unwrap(),
        ];
        assert_eq!(s.add_patterns(patterns.clone(), false).unwrap(), 2);
        assert_eq!(s.add_patterns(patterns, false).unwrap(), 0);
        assert_eq!(s.len(), 2);
    }

    #[test]
    fn test_failed_batch_stores_nothing() {
        let mut s = store();
        let err = s
            .add_patterns(
                vec![
                    EntityPattern::phrase("HELLO", "hello world"),
                    EntityPattern::tokens("BAD", json!([{"ASDF": "x"}])).unwrap(),
                    EntityPattern::tokens("WORSE", json!([{"LOWER": "y", "OP": "??"}])).unwrap(),
                ],
                true,
            )
            .unwrap_err();
        match err {
            RulerError::PatternValidation { errors } => assert_eq!(errors.len(), 2),
            other => panic!("erro inesperado: {other:?}"),
        }
        assert!(s.is_empty());
        assert!(s.find_matches(&crate::tokenizer::tokenize("hello world")).is_empty());
    }

    #[test]
    fn test_unvalidated_error_is_first_problem() {
        let mut s = store();
        let err = s
            .add_patterns(vec![EntityPattern::tokens("BAD", json!([{"ASDF": "x"}])).unwrap()], false)
            .unwrap_err();
        assert!(matches!(err, RulerError::InvalidPattern(ref msg) if msg.contains("ASDF")));
    }

    #[test]
    fn test_empty_separator_is_rejected() {
        assert!(matches!(PatternStore::new("", Attr::Orth), Err(RulerError::InvalidConfig(_))));
    }

    #[test]
    fn test_labels_and_ids_are_distinct() {
        let mut s = store();
        s.add_patterns(
            vec![
                EntityPattern::phrase("ORG", "Apple").with_id("a1"),
                EntityPattern::phrase("ORG", "Google").with_id("g1"),
                EntityPattern::phrase("GPE", "Berlin").with_id("a1"),
            ],
            false,
        )
        .unwrap();
        assert_eq!(s.labels(), vec!["ORG", "GPE"]);
        assert_eq!(s.ent_ids(), vec!["a1", "g1"]);
    }
}
