//! Registro de provedores de padrões.
//!
//! Um provedor é uma função nomeada que devolve uma lista de padrões. O
//! pipeline pode associar um provedor a um componente e só chamá-lo em
//! [`Pipeline::initialize`](crate::pipeline::Pipeline::initialize).

use std::fmt;

use rustc_hash::FxHashMap;

use crate::error::{Result, RulerError};
use crate::pattern::EntityPattern;

/// Função que produz padrões sob demanda.
pub type PatternProvider = Box<dyn Fn() -> Vec<EntityPattern> + Send + Sync>;

#[derive(Default)]
pub struct PatternRegistry {
    providers: FxHashMap<String, PatternProvider>,
}

impl PatternRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registra (ou substitui) o provedor `name`.
    pub fn register<F>(&mut self, name: impl Into<String>, provider: F)
    where
        F: Fn() -> Vec<EntityPattern> + Send + Sync + 'static,
    {
        self.providers.insert(name.into(), Box::new(provider));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.providers.contains_key(name)
    }

    /// Executa o provedor `name`.
    pub fn resolve(&self, name: &str) -> Result<Vec<EntityPattern>> {
        self.providers
            .get(name)
            .map(|provider| provider())
            .ok_or_else(|| RulerError::UnknownProvider(name.to_string()))
    }

    /// Nomes registrados, em ordem alfabética.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.providers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for PatternRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PatternRegistry")
            .field("providers", &self.names())
            .finish()
    }
}
