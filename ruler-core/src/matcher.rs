//! # Matcher de Padrões de Tokens
//!
//! Procura sequências de tokens que satisfazem uma lista de restrições com
//! operadores de repetição.
//!
//! ## Algoritmo
//!
//! Para cada padrão e cada posição inicial, busca o **maior** alinhamento
//! possível entre restrições e tokens:
//!
//! 1. Calcula uma tabela `sat[c][t]`: a restrição `c` aceita o token `t`?
//! 2. `longest(c, t)` devolve o maior fim de match consumindo as restrições
//!    `c..` a partir do token `t`. A restrição `c` pode consumir de `min` a
//!    `max` tokens consecutivos que a satisfazem; todas as quantidades são
//!    testadas (backtracking) e a que leva ao maior fim vence.
//! 3. `longest(c, t)` não depende da posição inicial, então é memorizado por
//!    padrão/documento, o que limita o custo a `O(restrições × tokens²)`.
//!
//! Matches de comprimento zero (ex: `[{"ORTH": "foo", "OP": "*"}]` sobre um
//! token diferente de "foo") são descartados.

use serde::{Deserialize, Serialize};

use crate::pattern::TokenConstraint;
use crate::tokenizer::Token;

/// Um match bruto, antes da resolução de sobreposições.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    /// Chave armazenada (`label` ou `label + sep + id`)
    pub key: String,
    /// Primeiro token (inclusivo)
    pub start: usize,
    /// Último token (exclusivo)
    pub end: usize,
    /// Ordem de registro do padrão que gerou o match
    pub order: usize,
}

impl Match {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

#[derive(Debug, Clone)]
struct CompiledPattern {
    key: String,
    order: usize,
    constraints: Vec<TokenConstraint>,
}

/// Matcher de sequências de restrições por token.
#[derive(Debug, Clone, Default)]
pub struct TokenMatcher {
    patterns: Vec<CompiledPattern>,
}

impl TokenMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registra um padrão compilado sob a chave `key`.
    pub fn add(&mut self, key: impl Into<String>, order: usize, constraints: Vec<TokenConstraint>) {
        self.patterns.push(CompiledPattern {
            key: key.into(),
            order,
            constraints,
        });
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn clear(&mut self) {
        self.patterns.clear();
    }

    /// Todos os matches, um por padrão e posição inicial (o mais longo).
    ///
    /// Ordenados por ordem de registro do padrão e depois por início.
    pub fn find_matches(&self, tokens: &[Token]) -> Vec<Match> {
        let mut matches = Vec::new();
        for pattern in &self.patterns {
            let mut search = Search::new(&pattern.constraints, tokens);
            for start in 0..tokens.len() {
                if let Some(end) = search.longest(0, start) {
                    if end > start {
                        matches.push(Match {
                            key: pattern.key.clone(),
                            start,
                            end,
                            order: pattern.order,
                        });
                    }
                }
            }
        }
        matches
    }
}

/// Estado da busca de um padrão em um documento
struct Search<'a> {
    constraints: &'a [TokenConstraint],
    n_tokens: usize,
    sat: Vec<Vec<bool>>,
    memo: Vec<Vec<Option<Option<usize>>>>,
}

impl<'a> Search<'a> {
    fn new(constraints: &'a [TokenConstraint], tokens: &[Token]) -> Self {
        let sat = constraints
            .iter()
            .map(|c| tokens.iter().map(|t| c.matches(t)).collect())
            .collect();
        Self {
            constraints,
            n_tokens: tokens.len(),
            sat,
            memo: vec![vec![None; tokens.len() + 1]; constraints.len()],
        }
    }

    /// Maior fim alcançável casando as restrições `ci..` a partir de `pos`.
    fn longest(&mut self, ci: usize, pos: usize) -> Option<usize> {
        if ci == self.constraints.len() {
            return Some(pos);
        }
        if let Some(cached) = self.memo[ci][pos] {
            return cached;
        }

        let q = self.constraints[ci].quantifier;
        let limit = q.max.unwrap_or(usize::MAX);
        let mut available = 0;
        while available < limit
            && pos + available < self.n_tokens
            && self.sat[ci][pos + available] != q.negate
        {
            available += 1;
        }

        let mut best = None;
        if available >= q.min {
            for k in q.min..=available {
                best = best.max(self.longest(ci + 1, pos + k));
            }
        }

        self.memo[ci][pos] = Some(best);
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::{compile_token_pattern, EntityPattern, PatternKind};
    use crate::tokenizer::tokenize;
    use serde_json::{json, Value};

    fn matcher(patterns: &[(&str, Value)]) -> TokenMatcher {
        let mut m = TokenMatcher::new();
        for (order, (key, spec)) in patterns.iter().enumerate() {
            let PatternKind::Tokens(specs) = EntityPattern::tokens(*key, spec.clone()).unwrap().pattern else {
                unreachable!()
            };
            m.add(*key, order, compile_token_pattern(&specs).unwrap());
        }
        m
    }

    fn spans(matches: &[Match]) -> Vec<(usize, usize)> {
        matches.iter().map(|m| (m.start, m.end)).collect()
    }

    #[test]
    fn test_exact_sequence() {
        let m = matcher(&[("BYE", json!([{"LOWER": "bye"}, {"LOWER": "bye"}]))]);
        let found = m.find_matches(&tokenize("hello world Bye bye"));
        assert_eq!(spans(&found), vec![(2, 4)]);
        assert_eq!(found[0].key, "BYE");
    }

    #[test]
    fn test_star_is_greedy_per_start() {
        let m = matcher(&[("COMPLEX", json!([{"ORTH": "foo", "OP": "*"}]))]);
        let found = m.find_matches(&tokenize("foo foo bye bye"));
        // (0,2) e (1,2); nenhum match vazio
        assert_eq!(spans(&found), vec![(0, 2), (1, 2)]);
    }

    #[test]
    fn test_backtracking_after_plus() {
        // "+" não pode engolir o "b" exigido pela restrição seguinte
        let m = matcher(&[(
            "X",
            json!([{"IS_ALPHA": true, "OP": "+"}, {"LOWER": "b"}]),
        )]);
        let found = m.find_matches(&tokenize("a b c b"));
        assert_eq!(found[0].start, 0);
        assert_eq!(found[0].end, 4);
    }

    #[test]
    fn test_optional_and_negation() {
        let m = matcher(&[(
            "TITLE",
            json!([{"LOWER": "dr", "OP": "?"}, {"IS_TITLE": true}, {"ORTH": ",", "OP": "!"}]),
        )]);
        let found = m.find_matches(&tokenize("dr Silva disse , Ana"));
        assert_eq!(spans(&found), vec![(0, 3), (1, 3)]);
    }

    #[test]
    fn test_counted_quantifier() {
        let m = matcher(&[("NUM", json!([{"IS_DIGIT": true, "OP": "{2,3}"}]))]);
        let found = m.find_matches(&tokenize("1 2 3 4 x 5"));
        assert_eq!(spans(&found), vec![(0, 3), (1, 4), (2, 4)]);
    }

    #[test]
    fn test_no_match_on_empty_doc() {
        let m = matcher(&[("X", json!([{"OP": "*"}]))]);
        assert!(m.find_matches(&[]).is_empty());
    }
}
