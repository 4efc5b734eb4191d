//! # Pipeline — Componentes Nomeados com Eventos Observáveis
//!
//! O pipeline tokeniza o texto, cria um [`Doc`] e passa o documento por uma
//! sequência ordenada de componentes (tipicamente um ou mais
//! [`EntityRuler`]s, às vezes precedidos de componentes que já gravam
//! entidades). Cada passo pode ser acompanhado por eventos enviados em um
//! canal `mpsc`, o que permite ao servidor WebSocket transmitir o progresso
//! em tempo real.

use std::any::Any;
use std::sync::mpsc;
use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::doc::{Doc, EntitySpan, Span};
use crate::error::{Result, RulerError};
use crate::pattern::EntityPattern;
use crate::registry::PatternRegistry;
use crate::ruler::{EntityRuler, RulerStatus};
use crate::tokenizer::Token;

/// Resultado de um componente sobre um documento.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "message", rename_all = "snake_case")]
pub enum ComponentStatus {
    Ok,
    /// O componente rodou mas não fez nada útil (ex: ruler sem padrões).
    Warning(String),
}

/// Um passo do pipeline.
///
/// Closures `Fn(&mut Doc) -> Result<()>` também são componentes.
pub trait Component: Any + Send + Sync {
    fn process(&self, doc: &mut Doc) -> Result<ComponentStatus>;

    /// Chamado por [`Pipeline::initialize`] com os padrões do provedor
    /// associado ao componente (se houver).
    fn initialize(&mut self, _patterns: Option<Vec<EntityPattern>>) -> Result<()> {
        Ok(())
    }

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<F> Component for F
where
    F: Fn(&mut Doc) -> Result<()> + Send + Sync + 'static,
{
    fn process(&self, doc: &mut Doc) -> Result<ComponentStatus> {
        self(doc)?;
        Ok(ComponentStatus::Ok)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl Component for EntityRuler {
    fn process(&self, doc: &mut Doc) -> Result<ComponentStatus> {
        Ok(match self.apply(doc)? {
            RulerStatus::Applied { .. } => ComponentStatus::Ok,
            RulerStatus::NoPatterns => {
                ComponentStatus::Warning("entity ruler sem padrões; nenhuma entidade adicionada".into())
            }
        })
    }

    fn initialize(&mut self, patterns: Option<Vec<EntityPattern>>) -> Result<()> {
        EntityRuler::initialize(self, patterns)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Eventos emitidos pelo pipeline durante o processamento.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum PipelineEvent {
    /// **Passo 1**: Tokenização concluída.
    TokenizationDone {
        tokens: Vec<Token>,
        total: usize,
    },
    /// **Passo 2 (por componente)**: entidades do documento após o componente.
    ComponentApplied {
        name: String,
        entities: Vec<Span>,
        elapsed_us: u64,
    },
    /// Um componente rodou sem efeito (não é erro).
    Warning {
        component: String,
        message: String,
    },
    /// **Conclusão**: entidades finais e tags IOB.
    Done {
        entities: Vec<EntitySpan>,
        iob_tags: Vec<String>,
        total_tokens: usize,
        processing_ms: u64,
    },
    /// **Falha**: um componente devolveu erro; o processamento parou.
    Error {
        message: String,
    },
}

struct Pipe {
    name: String,
    component: Box<dyn Component>,
    patterns_from: Option<String>,
}

/// Sequência ordenada de componentes nomeados.
///
/// # Modos de Uso
/// - **Sync**: [`analyze`](Self::analyze) para chamadas diretas.
/// - **Streaming**: [`analyze_streaming`](Self::analyze_streaming) para UIs reativas.
/// - **Lote**: [`pipe`](Self::pipe), opcionalmente em paralelo.
#[derive(Default)]
pub struct Pipeline {
    pipes: Vec<Pipe>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adiciona um componente ao final.
    pub fn add_pipe(&mut self, name: impl Into<String>, component: impl Component) -> Result<()> {
        let name = name.into();
        self.ensure_unique(&name)?;
        debug!(%name, "componente adicionado");
        self.pipes.push(Pipe { name, component: Box::new(component), patterns_from: None });
        Ok(())
    }

    /// Adiciona um componente imediatamente antes de `before`.
    pub fn add_pipe_before(
        &mut self,
        name: impl Into<String>,
        component: impl Component,
        before: &str,
    ) -> Result<()> {
        let name = name.into();
        self.ensure_unique(&name)?;
        let pos = self.position(before)?;
        debug!(%name, before, "componente adicionado");
        self.pipes.insert(pos, Pipe { name, component: Box::new(component), patterns_from: None });
        Ok(())
    }

    /// Remove e devolve o componente `name`.
    pub fn remove_pipe(&mut self, name: &str) -> Result<Box<dyn Component>> {
        let pos = self.position(name)?;
        Ok(self.pipes.remove(pos).component)
    }

    pub fn pipe_names(&self) -> Vec<&str> {
        self.pipes.iter().map(|p| p.name.as_str()).collect()
    }

    pub fn has_pipe(&self, name: &str) -> bool {
        self.pipes.iter().any(|p| p.name == name)
    }

    /// Acesso tipado a um componente (ex: `get_pipe::<EntityRuler>("ruler")`).
    pub fn get_pipe<T: Component>(&self, name: &str) -> Option<&T> {
        self.pipes
            .iter()
            .find(|p| p.name == name)
            .and_then(|p| p.component.as_any().downcast_ref::<T>())
    }

    pub fn get_pipe_mut<T: Component>(&mut self, name: &str) -> Option<&mut T> {
        self.pipes
            .iter_mut()
            .find(|p| p.name == name)
            .and_then(|p| p.component.as_any_mut().downcast_mut::<T>())
    }

    /// Associa o provedor `provider` ao componente `component`; os padrões
    /// serão resolvidos em [`initialize`](Self::initialize).
    pub fn set_initialize_patterns(&mut self, component: &str, provider: impl Into<String>) -> Result<()> {
        let pos = self.position(component)?;
        self.pipes[pos].patterns_from = Some(provider.into());
        Ok(())
    }

    /// Inicializa todos os componentes.
    ///
    /// Os provedores são resolvidos antes de qualquer componente ser tocado,
    /// então um nome desconhecido não altera o pipeline. Componentes sem
    /// provedor recebem `None` (um entity ruler fica vazio).
    pub fn initialize(&mut self, registry: &PatternRegistry) -> Result<()> {
        let resolved = self
            .pipes
            .iter()
            .map(|p| p.patterns_from.as_deref().map(|name| registry.resolve(name)).transpose())
            .collect::<Result<Vec<_>>>()?;

        for (pipe, patterns) in self.pipes.iter_mut().zip(resolved) {
            pipe.component.initialize(patterns)?;
        }
        debug!(components = self.pipes.len(), "pipeline inicializado");
        Ok(())
    }

    /// Tokeniza e processa o texto.
    pub fn analyze(&self, text: &str) -> Result<Doc> {
        self.process_doc(Doc::new(text))
    }

    /// Processa um documento já tokenizado.
    pub fn process_doc(&self, mut doc: Doc) -> Result<Doc> {
        for pipe in &self.pipes {
            if let ComponentStatus::Warning(message) = pipe.component.process(&mut doc)? {
                warn!(component = %pipe.name, "{message}");
            }
        }
        Ok(doc)
    }

    /// Executa o pipeline enviando eventos de progresso.
    ///
    /// # Fluxo de Eventos
    /// 1. `TokenizationDone`
    /// 2. `ComponentApplied` para cada componente (precedido de `Warning`
    ///    quando o componente não teve efeito)
    /// 3. `Done`, ou `Error` no primeiro componente que falhar
    pub fn analyze_streaming(&self, text: &str, tx: mpsc::Sender<PipelineEvent>) {
        let start = Instant::now();

        let mut doc = Doc::new(text);
        let _ = tx.send(PipelineEvent::TokenizationDone {
            tokens: doc.tokens().to_vec(),
            total: doc.len(),
        });

        for pipe in &self.pipes {
            let step = Instant::now();
            match pipe.component.process(&mut doc) {
                Ok(status) => {
                    if let ComponentStatus::Warning(message) = status {
                        warn!(component = %pipe.name, "{message}");
                        let _ = tx.send(PipelineEvent::Warning {
                            component: pipe.name.clone(),
                            message,
                        });
                    }
                    let _ = tx.send(PipelineEvent::ComponentApplied {
                        name: pipe.name.clone(),
                        entities: doc.ents().to_vec(),
                        elapsed_us: step.elapsed().as_micros() as u64,
                    });
                }
                Err(err) => {
                    let _ = tx.send(PipelineEvent::Error {
                        message: format!("{}: {err}", pipe.name),
                    });
                    return;
                }
            }
        }

        let _ = tx.send(PipelineEvent::Done {
            entities: doc.entity_spans(),
            iob_tags: doc.iob_tags(),
            total_tokens: doc.len(),
            processing_ms: start.elapsed().as_millis() as u64,
        });
    }

    /// Processa vários textos, devolvendo os documentos na ordem de entrada.
    ///
    /// Com `n_process > 1` os textos são distribuídos em um pool rayon de
    /// `n_process` threads que compartilham o pipeline somente leitura.
    pub fn pipe<S>(&self, texts: &[S], n_process: usize) -> Result<Vec<Doc>>
    where
        S: AsRef<str> + Sync,
    {
        if n_process <= 1 {
            return texts.iter().map(|t| self.analyze(t.as_ref())).collect();
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(n_process)
            .build()
            .map_err(|e| RulerError::Pipeline(e.to_string()))?;
        pool.install(|| texts.par_iter().map(|t| self.analyze(t.as_ref())).collect())
    }

    fn ensure_unique(&self, name: &str) -> Result<()> {
        if self.has_pipe(name) {
            return Err(RulerError::DuplicateComponent(name.to_string()));
        }
        Ok(())
    }

    fn position(&self, name: &str) -> Result<usize> {
        self.pipes
            .iter()
            .position(|p| p.name == name)
            .ok_or_else(|| RulerError::UnknownComponent(name.to_string()))
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline").field("pipes", &self.pipe_names()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RulerConfig;

    fn ruler() -> EntityRuler {
        EntityRuler::with_patterns(
            RulerConfig::default(),
            vec![
                EntityPattern::phrase("HELLO", "hello world"),
                EntityPattern::phrase("GPE", "São Paulo"),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_pipeline_basic() {
        let mut nlp = Pipeline::new();
        nlp.add_pipe("entity_ruler", ruler()).unwrap();
        let doc = nlp.analyze("São Paulo é a maior cidade do Brasil.").unwrap();
        assert_eq!(doc.ents().len(), 1);
        assert_eq!(doc.ents()[0].label, "GPE");
    }

    #[test]
    fn test_pipeline_empty() {
        let nlp = Pipeline::new();
        let doc = nlp.analyze("").unwrap();
        assert!(doc.is_empty());
        assert!(doc.ents().is_empty());
    }

    #[test]
    fn test_pipe_names_and_errors() {
        let mut nlp = Pipeline::new();
        nlp.add_pipe("entity_ruler", ruler()).unwrap();
        nlp.add_pipe_before("ner", |_doc: &mut Doc| -> Result<()> { Ok(()) }, "entity_ruler").unwrap();
        assert_eq!(nlp.pipe_names(), vec!["ner", "entity_ruler"]);

        assert!(matches!(
            nlp.add_pipe("ner", |_doc: &mut Doc| -> Result<()> { Ok(()) }),
            Err(RulerError::DuplicateComponent(_))
        ));
        assert!(matches!(nlp.remove_pipe("parser"), Err(RulerError::UnknownComponent(_))));

        nlp.remove_pipe("ner").unwrap();
        assert!(!nlp.has_pipe("ner"));
        assert!(nlp.get_pipe::<EntityRuler>("entity_ruler").is_some());
    }

    #[test]
    fn test_pipeline_events_streaming() {
        let mut nlp = Pipeline::new();
        nlp.add_pipe("empty_ruler", EntityRuler::new(RulerConfig::default()).unwrap()).unwrap();
        nlp.add_pipe("entity_ruler", ruler()).unwrap();

        let (tx, rx) = mpsc::channel();
        nlp.analyze_streaming("São Paulo é a maior cidade do Brasil.", tx);
        let events: Vec<PipelineEvent> = rx.try_iter().collect();

        assert!(
            matches!(&events[0], PipelineEvent::TokenizationDone { .. }),
            "Primeiro evento deve ser TokenizationDone"
        );
        assert!(events.iter().any(|e| matches!(e, PipelineEvent::Warning { component, .. } if component == "empty_ruler")));
        match events.last().unwrap() {
            PipelineEvent::Done { entities, iob_tags, .. } => {
                assert_eq!(entities[0].text, "São Paulo");
                assert_eq!(iob_tags[..2], ["B-GPE".to_string(), "I-GPE".to_string()]);
            }
            other => panic!("Último evento deve ser Done, veio {other:?}"),
        }
    }

    #[test]
    fn test_streaming_stops_on_error() {
        let mut nlp = Pipeline::new();
        nlp.add_pipe("falha", |_doc: &mut Doc| -> Result<()> { Err(RulerError::Pipeline("quebrou".into())) }).unwrap();
        nlp.add_pipe("entity_ruler", ruler()).unwrap();

        let (tx, rx) = mpsc::channel();
        nlp.analyze_streaming("hello world", tx);
        let events: Vec<PipelineEvent> = rx.try_iter().collect();
        assert_eq!(events.len(), 2);
        assert!(matches!(&events[1], PipelineEvent::Error { message } if message.contains("quebrou")));
    }

    #[test]
    fn test_initialize_with_registry() {
        let mut registry = PatternRegistry::new();
        registry.register("saudacoes", || vec![EntityPattern::phrase("HELLO", "hello world")]);

        let mut nlp = Pipeline::new();
        nlp.add_pipe("entity_ruler", EntityRuler::new(RulerConfig::default()).unwrap()).unwrap();
        nlp.set_initialize_patterns("entity_ruler", "saudacoes").unwrap();
        nlp.initialize(&registry).unwrap();

        let ruler = nlp.get_pipe::<EntityRuler>("entity_ruler").unwrap();
        assert_eq!(ruler.len(), 1);

        nlp.set_initialize_patterns("entity_ruler", "inexistente").unwrap();
        assert!(matches!(nlp.initialize(&registry), Err(RulerError::UnknownProvider(_))));
        assert_eq!(nlp.get_pipe::<EntityRuler>("entity_ruler").unwrap().len(), 1);
    }

    #[test]
    fn test_pipe_keeps_order() {
        let mut nlp = Pipeline::new();
        nlp.add_pipe("entity_ruler", ruler()).unwrap();
        let texts = vec!["hello world", "nada aqui", "São Paulo e hello world"];
        let sequential = nlp.pipe(&texts, 1).unwrap();
        let parallel = nlp.pipe(&texts, 2).unwrap();
        assert_eq!(sequential, parallel);
        assert_eq!(parallel[2].ents().len(), 2);
    }
}
