//! Static registry mapping stage identifiers to factories

use super::{StageContext, StageFactory};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

#[derive(Debug, Clone, thiserror::Error)]
pub enum ResolutionError {
    #[error("'{0}' isn't a stage reference (expected an alias or <namespace>.<Name>)")]
    NotAReference(String),

    #[error("Unknown stage namespace '{namespace}' in '{token}'")]
    UnknownNamespace { token: String, namespace: String },

    #[error("Stage namespace '{namespace}' does not define '{name}'")]
    UnknownStage {
        token: String,
        namespace: String,
        name: String,
    },
}

/// A stage identifier resolved to its factory
#[derive(Clone)]
pub struct ResolvedStage {
    /// Identifier as configured (alias or reference)
    pub token: String,
    /// Fully-qualified reference
    pub reference: String,
    /// Stage name, the last component of the reference
    pub name: String,
    factory: StageFactory,
}

impl ResolvedStage {
    pub fn instantiate(&self, ctx: &StageContext<'_>) -> anyhow::Result<Box<dyn super::Stage>> {
        (self.factory)(ctx)
    }
}

impl std::fmt::Debug for ResolvedStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedStage")
            .field("token", &self.token)
            .field("reference", &self.reference)
            .finish()
    }
}

/// Maps short aliases to fully-qualified references, and references to
/// factories grouped by namespace
#[derive(Clone, Default)]
pub struct StageRegistry {
    aliases: BTreeMap<String, String>,
    namespaces: HashMap<String, HashMap<String, StageFactory>>,
}

impl StageRegistry {
    /// Registry with no stages at all
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registry holding the built-in stages and their aliases
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        crate::stages::register_builtin(&mut registry);
        registry
    }

    /// Register a factory under `<namespace>.<Name>`
    pub fn register<F>(&mut self, reference: &str, factory: F) -> Result<(), ResolutionError>
    where
        F: Fn(&StageContext<'_>) -> anyhow::Result<Box<dyn super::Stage>> + Send + Sync + 'static,
    {
        let (namespace, name) = split_reference(reference)?;
        self.register_in(namespace, name, factory);
        Ok(())
    }

    /// Register a factory as `name` inside `namespace`
    pub fn register_in<F>(&mut self, namespace: &str, name: &str, factory: F)
    where
        F: Fn(&StageContext<'_>) -> anyhow::Result<Box<dyn super::Stage>> + Send + Sync + 'static,
    {
        self.namespaces
            .entry(namespace.to_string())
            .or_default()
            .insert(name.to_string(), Arc::new(factory));
    }

    /// Add a short alias for a reference
    pub fn alias(&mut self, alias: &str, reference: &str) {
        self.aliases.insert(alias.to_string(), reference.to_string());
    }

    /// Resolve an alias or a fully-qualified reference
    pub fn resolve(&self, token: &str) -> Result<ResolvedStage, ResolutionError> {
        let reference = self
            .aliases
            .get(token)
            .map(String::as_str)
            .unwrap_or(token);

        let (namespace, name) = split_reference(reference)?;

        let stages = self
            .namespaces
            .get(namespace)
            .ok_or_else(|| ResolutionError::UnknownNamespace {
                token: token.to_string(),
                namespace: namespace.to_string(),
            })?;

        let factory = stages
            .get(name)
            .ok_or_else(|| ResolutionError::UnknownStage {
                token: token.to_string(),
                namespace: namespace.to_string(),
                name: name.to_string(),
            })?;

        Ok(ResolvedStage {
            token: token.to_string(),
            reference: reference.to_string(),
            name: name.to_string(),
            factory: Arc::clone(factory),
        })
    }

    /// Aliases and their references, sorted by alias
    pub fn aliases(&self) -> Vec<(String, String)> {
        self.aliases
            .iter()
            .map(|(a, r)| (a.clone(), r.clone()))
            .collect()
    }

    /// All registered references, sorted
    pub fn references(&self) -> Vec<String> {
        let mut refs: Vec<String> = self
            .namespaces
            .iter()
            .flat_map(|(ns, stages)| stages.keys().map(move |name| format!("{}.{}", ns, name)))
            .collect();
        refs.sort();
        refs
    }
}

fn split_reference(reference: &str) -> Result<(&str, &str), ResolutionError> {
    reference
        .rsplit_once('.')
        .ok_or_else(|| ResolutionError::NotAReference(reference.to_string()))
}
