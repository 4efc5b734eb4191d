//! Configuração do [`EntityRuler`](crate::ruler::EntityRuler).

use serde::{Deserialize, Serialize};

use crate::attrs::Attr;

/// Separador padrão entre label e id nas chaves armazenadas.
pub const DEFAULT_ENT_ID_SEP: &str = "||";

/// Critério de desempate entre matches de mesmo comprimento.
///
/// Matches mais longos sempre vencem; este critério só decide entre matches
/// com o mesmo número de tokens que se sobrepõem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// Vence o match que começa antes; em caso de empate, o padrão registrado primeiro.
    #[default]
    EarliestStart,
    /// Vence o padrão registrado primeiro; em caso de empate, o que começa antes.
    FirstRegistered,
}

/// Opções do entity ruler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RulerConfig {
    /// Atributo comparado pelo phrase matcher (`None` = `ORTH`).
    pub phrase_matcher_attr: Option<Attr>,
    /// Valida os padrões ao adicionar, listando todas as chaves inválidas.
    pub validate: bool,
    /// Permite que matches novos substituam entidades já existentes.
    pub overwrite_ents: bool,
    /// Separador entre label e id (ex: `"TECH_ORG||a1"`).
    pub ent_id_sep: String,
    pub tie_break: TieBreak,
}

impl Default for RulerConfig {
    fn default() -> Self {
        Self {
            phrase_matcher_attr: None,
            validate: false,
            overwrite_ents: false,
            ent_id_sep: DEFAULT_ENT_ID_SEP.to_string(),
            tie_break: TieBreak::default(),
        }
    }
}

impl RulerConfig {
    pub fn with_phrase_matcher_attr(mut self, attr: Attr) -> Self {
        self.phrase_matcher_attr = Some(attr);
        self
    }

    pub fn with_validate(mut self, validate: bool) -> Self {
        self.validate = validate;
        self
    }

    pub fn with_overwrite_ents(mut self, overwrite: bool) -> Self {
        self.overwrite_ents = overwrite;
        self
    }

    pub fn with_ent_id_sep(mut self, sep: impl Into<String>) -> Self {
        self.ent_id_sep = sep.into();
        self
    }

    pub fn with_tie_break(mut self, tie_break: TieBreak) -> Self {
        self.tie_break = tie_break;
        self
    }

    /// Atributo efetivo do phrase matcher.
    pub fn phrase_attr(&self) -> Attr {
        self.phrase_matcher_attr.unwrap_or(Attr::Orth)
    }
}
