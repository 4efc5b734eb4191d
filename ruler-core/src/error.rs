//! # Erros do Entity Ruler
//!
//! Todos os erros do crate passam por [`RulerError`]. As falhas são síncronas e
//! chegam ao chamador imediatamente; nenhuma operação faz retry.

use std::path::PathBuf;

use thiserror::Error;

/// Tipo `Result` do crate.
pub type Result<T> = std::result::Result<T, RulerError>;

/// Erro principal do ruler, dos matchers e do pipeline.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum RulerError {
    /// Padrões rejeitados pela validação (`validate = true`).
    /// Cada item descreve uma chave ou valor problemático.
    #[error("padrões inválidos: {}", errors.join("; "))]
    PatternValidation { errors: Vec<String> },

    /// Padrão malformado detectado ao compilar o matcher (`validate = false`).
    #[error("padrão inválido: {0}")]
    InvalidPattern(String),

    /// Configuração inconsistente (ex: `phrase_matcher_attr` não textual).
    #[error("configuração inválida: {0}")]
    InvalidConfig(String),

    /// Entidades novas e pré-existentes se sobrepõem sem resolução possível.
    #[error("conflito de entidades: {0}")]
    EntityConflict(String),

    /// Span fora dos limites do documento.
    #[error("span inválido: {0}")]
    InvalidSpan(String),

    /// Caminho inexistente (ou do tipo errado) ao carregar do disco.
    #[error("caminho inválido para carregar o ruler: {}", .0.display())]
    InvalidPath(PathBuf),

    /// JSON / JSONL malformado.
    #[error("erro de serialização: {0}")]
    Serialization(String),

    /// Provedor de padrões não registrado.
    #[error("provedor de padrões desconhecido: {0}")]
    UnknownProvider(String),

    /// Já existe um componente com este nome no pipeline.
    #[error("componente duplicado no pipeline: {0}")]
    DuplicateComponent(String),

    /// Componente não encontrado no pipeline.
    #[error("componente desconhecido no pipeline: {0}")]
    UnknownComponent(String),

    /// Falha ao montar a execução do pipeline (ex: pool de threads).
    #[error("erro no pipeline: {0}")]
    Pipeline(String),

    #[error("erro de IO: {0}")]
    Io(#[from] std::io::Error),
}

impl RulerError {
    pub fn invalid_pattern(msg: impl Into<String>) -> Self {
        RulerError::InvalidPattern(msg.into())
    }

    pub fn entity_conflict(msg: impl Into<String>) -> Self {
        RulerError::EntityConflict(msg.into())
    }

    pub fn serialization(msg: impl Into<String>) -> Self {
        RulerError::Serialization(msg.into())
    }

    /// Erros que correspondem a argumentos/dados inválidos do chamador
    /// (padrão malformado, conflito de entidades, caminho ou arquivo ruim).
    ///
    /// `PatternValidation` fica de fora: é a forma tipada e detalhada do mesmo
    /// problema, reportada apenas quando a validação está ligada.
    pub fn is_value_error(&self) -> bool {
        matches!(
            self,
            RulerError::InvalidPattern(_)
                | RulerError::InvalidConfig(_)
                | RulerError::EntityConflict(_)
                | RulerError::InvalidSpan(_)
                | RulerError::InvalidPath(_)
                | RulerError::Serialization(_)
        )
    }
}

impl From<serde_json::Error> for RulerError {
    fn from(err: serde_json::Error) -> Self {
        RulerError::Serialization(err.to_string())
    }
}
