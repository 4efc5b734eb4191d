//! # Entity Ruler
//!
//! Componente baseado em regras que adiciona entidades a um [`Doc`] a partir
//! de padrões de tokens e de frases.
//!
//! ## Algoritmo de `apply`
//!
//! 1. Coleta os matches dos dois matchers (tokens primeiro, depois frases).
//! 2. Ordena por comprimento decrescente e desempata pelo [`TieBreak`]
//!    configurado; percorre a lista mantendo apenas os matches que não
//!    tocam tokens já reservados (seleção gulosa).
//! 3. Sem `overwrite_ents`, descarta os matches que cruzam entidades já
//!    existentes no documento; com `overwrite_ents`, remove as entidades
//!    existentes que cruzam os matches novos.
//! 4. Converte cada chave em `(label, id)` e grava o conjunto final.
//!
//! ## Exemplo
//!
//! ```rust
//! use ruler_core::{Doc, EntityPattern, EntityRuler, RulerConfig};
//!
//! let mut ruler = EntityRuler::new(RulerConfig::default()).unwrap();
//! ruler
//!     .add_patterns(vec![EntityPattern::phrase("HELLO", "hello world")])
//!     .unwrap();
//!
//! let doc = ruler.process(Doc::new("hello world bye bye")).unwrap();
//! assert_eq!(doc.ents()[0].label, "HELLO");
//! ```

use std::cmp::Reverse;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::attrs::Attr;
use crate::config::{RulerConfig, TieBreak};
use crate::doc::{Doc, Span};
use crate::error::Result;
use crate::matcher::Match;
use crate::pattern::{EntityPattern, TokenSpec};
use crate::registry::PatternRegistry;
use crate::store::PatternStore;

/// Resultado de uma chamada de [`EntityRuler::apply`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RulerStatus {
    /// Entidades gravadas; `added` conta apenas as novas.
    Applied { added: usize },
    /// Nenhum padrão carregado: o documento não foi alterado.
    NoPatterns,
}

/// Anotador de entidades por regras.
#[derive(Debug, Clone)]
pub struct EntityRuler {
    pub(crate) config: RulerConfig,
    pub(crate) store: PatternStore,
}

impl EntityRuler {
    /// Cria um ruler vazio.
    ///
    /// Falha com `InvalidConfig` se `ent_id_sep` for vazio ou se o atributo
    /// do phrase matcher não for textual.
    pub fn new(config: RulerConfig) -> Result<Self> {
        let store = PatternStore::new(config.ent_id_sep.clone(), config.phrase_attr())?;
        Ok(Self { config, store })
    }

    /// Cria um ruler já com padrões.
    pub fn with_patterns(config: RulerConfig, patterns: Vec<EntityPattern>) -> Result<Self> {
        let mut ruler = Self::new(config)?;
        ruler.add_patterns(patterns)?;
        Ok(ruler)
    }

    pub fn config(&self) -> &RulerConfig {
        &self.config
    }

    pub fn phrase_matcher_attr(&self) -> Option<Attr> {
        self.config.phrase_matcher_attr
    }

    pub fn overwrite_ents(&self) -> bool {
        self.config.overwrite_ents
    }

    pub fn ent_id_sep(&self) -> &str {
        &self.config.ent_id_sep
    }

    /// Adiciona padrões (idempotente; o lote é tudo-ou-nada).
    pub fn add_patterns(&mut self, patterns: Vec<EntityPattern>) -> Result<()> {
        self.store.add_patterns(patterns, self.config.validate)?;
        Ok(())
    }

    /// Descarta os padrões atuais e carrega `patterns`.
    ///
    /// Se os novos padrões forem inválidos, os antigos continuam valendo.
    pub fn initialize(&mut self, patterns: Option<Vec<EntityPattern>>) -> Result<()> {
        let mut store = PatternStore::new(self.config.ent_id_sep.clone(), self.config.phrase_attr())?;
        if let Some(patterns) = patterns {
            store.add_patterns(patterns, self.config.validate)?;
        }
        debug!(patterns = store.len(), "ruler inicializado");
        self.store = store;
        Ok(())
    }

    /// Como [`initialize`](Self::initialize), com padrões vindos do provedor `name`.
    pub fn initialize_from_registry(&mut self, registry: &PatternRegistry, name: &str) -> Result<()> {
        let patterns = registry.resolve(name)?;
        self.initialize(Some(patterns))
    }

    pub fn clear(&mut self) {
        self.store.clear();
    }

    pub fn labels(&self) -> Vec<String> {
        self.store.labels()
    }

    pub fn ent_ids(&self) -> Vec<String> {
        self.store.ent_ids()
    }

    pub fn ent_id_map(&self) -> &FxHashMap<u64, (String, String)> {
        self.store.ent_id_map()
    }

    /// Número total de padrões.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn contains(&self, label: &str) -> bool {
        self.store.contains(label)
    }

    pub fn patterns(&self) -> Vec<EntityPattern> {
        self.store.patterns().to_vec()
    }

    pub fn phrase_patterns(&self) -> std::collections::BTreeMap<String, Vec<String>> {
        self.store.phrase_patterns()
    }

    pub fn token_patterns(&self) -> std::collections::BTreeMap<String, Vec<Vec<TokenSpec>>> {
        self.store.token_patterns()
    }

    /// Matches sem sobreposição entre si, na ordem de prioridade.
    pub fn find_matches(&self, doc: &Doc) -> Vec<Match> {
        let mut candidates = self.store.find_matches(doc.tokens());
        match self.config.tie_break {
            TieBreak::EarliestStart => candidates.sort_by_key(|m| (Reverse(m.len()), m.start, m.order)),
            TieBreak::FirstRegistered => candidates.sort_by_key(|m| (Reverse(m.len()), m.order, m.start)),
        }

        let mut taken = vec![false; doc.len()];
        let mut selected = Vec::new();
        for m in candidates {
            if taken[m.start..m.end].iter().any(|&t| t) {
                continue;
            }
            taken[m.start..m.end].iter_mut().for_each(|t| *t = true);
            selected.push(m);
        }
        selected
    }

    /// Anota o documento com as entidades encontradas.
    ///
    /// Sem padrões carregados apenas registra um aviso e devolve
    /// [`RulerStatus::NoPatterns`].
    pub fn apply(&self, doc: &mut Doc) -> Result<RulerStatus> {
        if self.store.is_empty() {
            warn!("entity ruler sem padrões: nenhuma entidade será adicionada");
            return Ok(RulerStatus::NoPatterns);
        }

        let existing = doc.ents().to_vec();
        let mut kept = existing.clone();
        let mut new_ents = Vec::new();

        for m in self.find_matches(doc) {
            if self.config.overwrite_ents {
                kept.retain(|e| !e.overlaps(m.start, m.end));
            } else if existing.iter().any(|e| e.overlaps(m.start, m.end)) {
                continue;
            }
            let (label, ent_id) = self.store.decode_key(&m.key);
            new_ents.push(Span { start: m.start, end: m.end, label, ent_id });
        }

        let added = new_ents.len();
        debug!(added, kept = kept.len(), "entidades do ruler");
        kept.extend(new_ents);
        doc.set_ents(kept)?;
        Ok(RulerStatus::Applied { added })
    }

    /// Versão por valor de [`apply`](Self::apply).
    pub fn process(&self, mut doc: Doc) -> Result<Doc> {
        self.apply(&mut doc)?;
        Ok(doc)
    }
}
