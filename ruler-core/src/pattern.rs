//! # Padrões de Entidade
//!
//! Um padrão associa uma label (e opcionalmente um id) a uma regra:
//!
//! - **Frase** (`"pattern": "hello world"`): texto literal, tokenizado ao ser
//!   adicionado e comparado token a token pelo [`PhraseMatcher`](crate::phrase_matcher::PhraseMatcher).
//! - **Tokens** (`"pattern": [{"LOWER": "bye"}, {"LOWER": "bye"}]`): sequência
//!   de restrições por token, com operadores de repetição (`OP`), avaliada pelo
//!   [`TokenMatcher`](crate::matcher::TokenMatcher).
//!
//! O formato JSON é o mesmo das listas de padrões usadas em arquivos `.jsonl`:
//!
//! ```json
//! {"label": "TECH_ORG", "pattern": "Apple", "id": "a1"}
//! {"label": "BYE", "pattern": [{"LOWER": "bye"}, {"LOWER": "bye", "OP": "+"}]}
//! ```
//!
//! ## Valores de restrição
//!
//! Cada chave de uma restrição é um [`Attr`]; o valor pode ser um literal
//! (texto, inteiro ou booleano, conforme o atributo) ou um objeto de
//! predicados: `REGEX`, `IN`, `NOT_IN`, `==`, `!=`, `>=`, `<=`, `>`, `<`.
//!
//! ## Operadores
//!
//! | `OP` | Significado |
//! |---|---|
//! | (ausente) | exatamente um token |
//! | `!` | exatamente um token que **não** satisfaz a restrição |
//! | `?` | zero ou um |
//! | `*` | zero ou mais |
//! | `+` | um ou mais |
//! | `{n}`, `{n,m}`, `{n,}`, `{,m}` | quantidades explícitas |

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::attrs::{Attr, AttrKind, AttrValue};
use crate::error::{self, RulerError};
use crate::tokenizer::Token;

/// Restrição de um token, como escrita no JSON.
pub type TokenSpec = Map<String, Value>;

/// Corpo de um padrão: frase literal ou sequência de restrições.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PatternKind {
    Phrase(String),
    Tokens(Vec<TokenSpec>),
}

/// Um padrão de entidade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityPattern {
    pub label: String,
    pub pattern: PatternKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl EntityPattern {
    pub fn phrase(label: impl Into<String>, phrase: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            pattern: PatternKind::Phrase(phrase.into()),
            id: None,
        }
    }

    /// Cria um padrão de tokens a partir de um array JSON de restrições.
    ///
    /// Falha com `InvalidPattern` se `specs` não for um array de objetos, assim
    /// como a desserialização do mesmo JSON falharia.
    pub fn tokens(label: impl Into<String>, specs: Value) -> error::Result<Self> {
        let specs: Vec<TokenSpec> = serde_json::from_value(specs)
            .map_err(|e| RulerError::InvalidPattern(format!("padrão de tokens deve ser um array de objetos: {e}")))?;
        Ok(Self {
            label: label.into(),
            pattern: PatternKind::Tokens(specs),
            id: None,
        })
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn is_phrase(&self) -> bool {
        matches!(self.pattern, PatternKind::Phrase(_))
    }
}

/// Quantidade de tokens consumida por uma restrição.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quantifier {
    pub min: usize,
    /// `None` = sem limite superior
    pub max: Option<usize>,
    /// Os tokens consumidos devem **falhar** a restrição (`OP: "!"`)
    pub negate: bool,
}

impl Quantifier {
    pub const ONE: Quantifier = Quantifier { min: 1, max: Some(1), negate: false };

    /// Interpreta o valor de `OP`.
    pub fn parse(op: &str) -> Option<Self> {
        let q = |min, max| Some(Quantifier { min, max, negate: false });
        match op {
            "1" => q(1, Some(1)),
            "!" => Some(Quantifier { min: 1, max: Some(1), negate: true }),
            "?" => q(0, Some(1)),
            "*" => q(0, None),
            "+" => q(1, None),
            _ => {
                let inner = op.strip_prefix('{')?.strip_suffix('}')?;
                match inner.split_once(',') {
                    None => {
                        let n = inner.trim().parse().ok()?;
                        if n == 0 {
                            return None;
                        }
                        q(n, Some(n))
                    }
                    Some((lo, hi)) => {
                        let (lo, hi) = (lo.trim(), hi.trim());
                        let min = if lo.is_empty() { 0 } else { lo.parse().ok()? };
                        let max = if hi.is_empty() { None } else { Some(hi.parse().ok()?) };
                        if let Some(max) = max {
                            if max < min || max == 0 {
                                return None;
                            }
                        }
                        q(min, max)
                    }
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CmpOp {
    Eq,
    Ne,
    Ge,
    Le,
    Gt,
    Lt,
}

impl CmpOp {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "==" => Some(CmpOp::Eq),
            "!=" => Some(CmpOp::Ne),
            ">=" => Some(CmpOp::Ge),
            "<=" => Some(CmpOp::Le),
            ">" => Some(CmpOp::Gt),
            "<" => Some(CmpOp::Lt),
            _ => None,
        }
    }

    fn eval(&self, lhs: i64, rhs: i64) -> bool {
        match self {
            CmpOp::Eq => lhs == rhs,
            CmpOp::Ne => lhs != rhs,
            CmpOp::Ge => lhs >= rhs,
            CmpOp::Le => lhs <= rhs,
            CmpOp::Gt => lhs > rhs,
            CmpOp::Lt => lhs < rhs,
        }
    }
}

#[derive(Debug, Clone)]
enum Predicate {
    Equals(AttrValue),
    Regex(regex::Regex),
    In(Vec<AttrValue>),
    NotIn(Vec<AttrValue>),
    Compare(CmpOp, i64),
}

impl Predicate {
    fn eval(&self, attr: Attr, token: &Token) -> bool {
        match self {
            Predicate::Equals(expected) => attr.get(token) == *expected,
            Predicate::Regex(re) => re.is_match(&attr.get_str(token)),
            Predicate::In(values) => values.contains(&attr.get(token)),
            Predicate::NotIn(values) => !values.contains(&attr.get(token)),
            Predicate::Compare(op, rhs) => match attr.get(token) {
                AttrValue::Int(lhs) => op.eval(lhs, *rhs),
                _ => false,
            },
        }
    }
}

/// Restrição compilada de um token.
#[derive(Debug, Clone)]
pub struct TokenConstraint {
    checks: Vec<(Attr, Predicate)>,
    pub quantifier: Quantifier,
}

impl TokenConstraint {
    /// O token satisfaz todas as verificações (ignorando o operador).
    /// Uma restrição sem verificações aceita qualquer token.
    pub fn matches(&self, token: &Token) -> bool {
        self.checks.iter().all(|(attr, pred)| pred.eval(*attr, token))
    }
}

/// Compila uma sequência de restrições.
///
/// Em caso de erro devolve **todos** os problemas encontrados, cada um
/// mencionando a posição do token e a chave responsável.
pub fn compile_token_pattern(specs: &[TokenSpec]) -> Result<Vec<TokenConstraint>, Vec<String>> {
    if specs.is_empty() {
        return Err(vec!["padrão de tokens vazio".to_string()]);
    }

    let mut errors = Vec::new();
    let mut constraints = Vec::with_capacity(specs.len());

    for (i, spec) in specs.iter().enumerate() {
        let mut checks = Vec::new();
        let mut quantifier = Quantifier::ONE;

        for (key, value) in spec {
            if key == "OP" {
                match value.as_str().and_then(Quantifier::parse) {
                    Some(q) => quantifier = q,
                    None => errors.push(format!("token {i}: OP inválido {value}")),
                }
                continue;
            }
            let attr = match key.parse::<Attr>() {
                Ok(attr) => attr,
                Err(_) => {
                    errors.push(format!("token {i}: chave desconhecida '{key}'"));
                    continue;
                }
            };
            match compile_value(attr, value) {
                Ok(preds) => checks.extend(preds.into_iter().map(|p| (attr, p))),
                Err(msg) => errors.push(format!("token {i}: {key}: {msg}")),
            }
        }

        constraints.push(TokenConstraint { checks, quantifier });
    }

    if errors.is_empty() {
        Ok(constraints)
    } else {
        Err(errors)
    }
}

fn compile_value(attr: Attr, value: &Value) -> Result<Vec<Predicate>, String> {
    match value {
        Value::Object(preds) => {
            if preds.is_empty() {
                return Err("objeto de predicados vazio".into());
            }
            preds
                .iter()
                .map(|(name, arg)| compile_predicate(attr, name, arg))
                .collect()
        }
        literal => Ok(vec![Predicate::Equals(literal_value(attr, literal)?)]),
    }
}

fn compile_predicate(attr: Attr, name: &str, arg: &Value) -> Result<Predicate, String> {
    match name {
        "REGEX" => {
            let src = arg.as_str().ok_or("REGEX espera texto")?;
            regex::Regex::new(src)
                .map(Predicate::Regex)
                .map_err(|e| format!("REGEX inválida: {e}"))
        }
        "IN" | "NOT_IN" => {
            let items = arg.as_array().ok_or_else(|| format!("{name} espera uma lista"))?;
            let values = items
                .iter()
                .map(|v| literal_value(attr, v))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(if name == "IN" { Predicate::In(values) } else { Predicate::NotIn(values) })
        }
        other => {
            let op = CmpOp::parse(other).ok_or_else(|| format!("predicado desconhecido '{other}'"))?;
            if attr.kind() != AttrKind::Int {
                return Err(format!("comparação '{other}' exige atributo numérico"));
            }
            let rhs = arg.as_i64().ok_or_else(|| format!("'{other}' espera um inteiro"))?;
            Ok(Predicate::Compare(op, rhs))
        }
    }
}

fn literal_value(attr: Attr, value: &Value) -> Result<AttrValue, String> {
    match (attr.kind(), value) {
        (AttrKind::Str, Value::String(s)) => Ok(AttrValue::Str(s.clone())),
        (AttrKind::Int, Value::Number(n)) => n
            .as_i64()
            .map(AttrValue::Int)
            .ok_or_else(|| format!("inteiro esperado, recebido {n}")),
        (AttrKind::Bool, Value::Bool(b)) => Ok(AttrValue::Bool(*b)),
        (kind, other) => Err(format!("valor {other} incompatível com atributo {kind:?}")),
    }
}
