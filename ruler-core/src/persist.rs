//! # Persistência do Entity Ruler
//!
//! Dois formatos:
//!
//! - **bytes**: um objeto JSON `{"cfg": {...}, "patterns": [...]}`;
//! - **disco**: um caminho terminado em `.jsonl` é um arquivo único com um
//!   padrão por linha; qualquer outro caminho é um diretório com `cfg` (JSON,
//!   opcional) e `patterns.jsonl` (obrigatório ao carregar).
//!
//! O carregamento monta um ruler novo ao lado do atual e só o substitui se
//! tudo der certo.

use std::fs;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::attrs::Attr;
use crate::config::{RulerConfig, TieBreak, DEFAULT_ENT_ID_SEP};
use crate::error::{Result, RulerError};
use crate::pattern::EntityPattern;
use crate::ruler::EntityRuler;

const CFG_FILE: &str = "cfg";
const PATTERNS_FILE: &str = "patterns.jsonl";

fn default_ent_id_sep() -> String {
    DEFAULT_ENT_ID_SEP.to_string()
}

/// Parte da configuração que acompanha os padrões salvos.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct PersistedConfig {
    #[serde(default)]
    overwrite_ents: bool,
    #[serde(default = "default_ent_id_sep")]
    ent_id_sep: String,
    #[serde(default)]
    phrase_matcher_attr: Option<Attr>,
    #[serde(default)]
    tie_break: TieBreak,
}

impl PersistedConfig {
    fn from_config(config: &RulerConfig) -> Self {
        Self {
            overwrite_ents: config.overwrite_ents,
            ent_id_sep: config.ent_id_sep.clone(),
            phrase_matcher_attr: config.phrase_matcher_attr,
            tie_break: config.tie_break,
        }
    }

    fn apply_to(self, config: &RulerConfig) -> RulerConfig {
        RulerConfig {
            overwrite_ents: self.overwrite_ents,
            ent_id_sep: self.ent_id_sep,
            phrase_matcher_attr: self.phrase_matcher_attr,
            tie_break: self.tie_break,
            ..config.clone()
        }
    }
}

#[derive(Serialize, Deserialize)]
struct RulerBytes {
    cfg: PersistedConfig,
    patterns: Vec<EntityPattern>,
}

impl EntityRuler {
    /// Serializa configuração e padrões.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let payload = RulerBytes {
            cfg: PersistedConfig::from_config(&self.config),
            patterns: self.store.patterns().to_vec(),
        };
        Ok(serde_json::to_vec(&payload)?)
    }

    /// Substitui configuração persistida e padrões pelos de `bytes`.
    pub fn from_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        let payload: RulerBytes = serde_json::from_slice(bytes)?;
        let config = payload.cfg.apply_to(&self.config);
        *self = EntityRuler::with_patterns(config, payload.patterns)?;
        Ok(())
    }

    /// Salva em um arquivo `.jsonl` ou em um diretório.
    pub fn to_disk(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if is_jsonl(path) {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            write_jsonl(path, self.store.patterns())?;
        } else {
            fs::create_dir_all(path)?;
            let cfg = serde_json::to_vec_pretty(&PersistedConfig::from_config(&self.config))?;
            fs::write(path.join(CFG_FILE), cfg)?;
            write_jsonl(&path.join(PATTERNS_FILE), self.store.patterns())?;
        }
        debug!(path = %path.display(), patterns = self.len(), "ruler salvo");
        Ok(())
    }

    /// Carrega de um arquivo `.jsonl` (só padrões) ou de um diretório
    /// salvo por [`to_disk`](Self::to_disk).
    pub fn from_disk(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(RulerError::InvalidPath(path.to_path_buf()));
        }

        let loaded = if is_jsonl(path) {
            if !path.is_file() {
                return Err(RulerError::InvalidPath(path.to_path_buf()));
            }
            EntityRuler::with_patterns(self.config.clone(), read_jsonl(path)?)?
        } else {
            if !path.is_dir() {
                return Err(RulerError::InvalidPath(path.to_path_buf()));
            }
            let patterns_path = path.join(PATTERNS_FILE);
            if !patterns_path.is_file() {
                return Err(RulerError::InvalidPath(patterns_path));
            }
            let cfg_path = path.join(CFG_FILE);
            let config = if cfg_path.is_file() {
                let cfg: PersistedConfig = serde_json::from_slice(&fs::read(&cfg_path)?)?;
                cfg.apply_to(&self.config)
            } else {
                self.config.clone()
            };
            EntityRuler::with_patterns(config, read_jsonl(&patterns_path)?)?
        };

        debug!(path = %path.display(), patterns = loaded.len(), "ruler carregado");
        *self = loaded;
        Ok(())
    }
}

fn is_jsonl(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "jsonl")
}

/// Lê um padrão por linha, ignorando linhas em branco.
pub fn read_jsonl(path: &Path) -> Result<Vec<EntityPattern>> {
    let reader = BufReader::new(fs::File::open(path)?);
    let mut patterns = Vec::new();
    for (n, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let pattern = serde_json::from_str(&line).map_err(|e| {
            RulerError::serialization(format!("{}:{}: {e}", path.display(), n + 1))
        })?;
        patterns.push(pattern);
    }
    Ok(patterns)
}

pub fn write_jsonl(path: &Path, patterns: &[EntityPattern]) -> Result<()> {
    let mut writer = BufWriter::new(fs::File::create(path)?);
    for pattern in patterns {
        serde_json::to_writer(&mut writer, pattern)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}
