//! # ruler-core — Reconhecimento de Entidades por Regras
//!
//! Este crate implementa um *entity ruler*: um componente que adiciona
//! entidades nomeadas a documentos tokenizados usando padrões escritos à mão,
//! sem nenhum modelo estatístico.
//!
//! ## Arquitetura do Sistema
//!
//! 1.  **Entrada**: Texto bruto (String).
//! 2.  **Tokenização** ([`tokenizer`]): O texto é dividido em tokens, preservando offsets originais.
//! 3.  **Documento** ([`doc`]): tokens + lista de entidades sem sobreposição.
//! 4.  **Matching**:
//!     *   **Padrões de tokens** ([`matcher`]): restrições por atributo ([`attrs`]) com operadores de repetição.
//!     *   **Frases** ([`phrase_matcher`]): frases literais comparadas por `ORTH` ou `LOWER`.
//! 5.  **Orquestração** ([`ruler`]): resolve sobreposições, respeita (ou sobrescreve) entidades
//!     existentes e grava o resultado no documento.
//! 6.  **Pipeline** ([`pipeline`]): encadeia componentes nomeados, com eventos observáveis.
//!
//! ## Exemplo de Uso
//!
//! ```rust
//! use ruler_core::{EntityPattern, EntityRuler, Pipeline, RulerConfig};
//! use serde_json::json;
//!
//! let ruler = EntityRuler::with_patterns(
//!     RulerConfig::default(),
//!     vec![
//!         EntityPattern::phrase("HELLO", "hello world"),
//!         EntityPattern::tokens("BYE", json!([{"LOWER": "bye"}, {"LOWER": "bye"}])).unwrap(),
//!     ],
//! )
//! .unwrap();
//!
//! let mut nlp = Pipeline::new();
//! nlp.add_pipe("entity_ruler", ruler).unwrap();
//!
//! let doc = nlp.analyze("hello world bye bye").unwrap();
//! for entity in doc.entity_spans() {
//!     println!("{} -> {}", entity.text, entity.label);
//! }
//! assert_eq!(doc.ents().len(), 2);
//! ```
//!
//! ## Módulos Principais
//!
//! - [`ruler`]: o entity ruler e seu algoritmo de resolução.
//! - [`store`]: armazenamento de padrões e chaves `label||id`.
//! - [`persist`]: serialização em bytes, `.jsonl` ou diretório.
//! - [`pipeline`]: orquestrador de componentes.

pub mod attrs;
pub mod config;
pub mod demo;
pub mod doc;
pub mod error;
pub mod matcher;
pub mod pattern;
pub mod persist;
pub mod phrase_matcher;
pub mod pipeline;
pub mod registry;
pub mod ruler;
pub mod store;
pub mod tokenizer;

pub use attrs::Attr;
pub use config::{RulerConfig, TieBreak};
pub use doc::{Doc, EntitySpan, Span};
pub use error::{Result, RulerError};
pub use pattern::{EntityPattern, PatternKind};
pub use pipeline::{Component, ComponentStatus, Pipeline, PipelineEvent};
pub use registry::PatternRegistry;
pub use ruler::{EntityRuler, RulerStatus};
pub use tokenizer::Token;
