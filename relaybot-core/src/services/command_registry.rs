use std::collections::HashMap;
use std::sync::Arc;
use once_cell::sync::OnceCell;
use tracing::{debug, info};
use relaybot_common::models::CommandDescriptor;

use crate::Error;
use crate::services::command_handler::CommandExecutor;

/// Maps a user-typed name onto its lookup key.
pub type AliasNormalizer = fn(&str) -> String;

/// Lowercases and folds "ё" into "е", since users type either.
pub fn default_alias_normalizer(name: &str) -> String {
    name.trim().to_lowercase().replace('ё', "е")
}

/// A descriptor paired with the code that runs it.
#[derive(Debug)]
pub struct RegisteredCommand {
    pub descriptor: Arc<CommandDescriptor>,
    pub executor: CommandExecutor,
}

/// Collects registrations and rejects alias collisions as they happen.
#[derive(Debug)]
pub struct RegistryBuilder {
    normalizer: AliasNormalizer,
    by_alias: HashMap<String, Arc<RegisteredCommand>>,
    commands: Vec<Arc<RegisteredCommand>>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::with_normalizer(default_alias_normalizer)
    }

    pub fn with_normalizer(normalizer: AliasNormalizer) -> Self {
        Self {
            normalizer,
            by_alias: HashMap::new(),
            commands: Vec::new(),
        }
    }

    /// Adds one command. Nothing is inserted if any of its names is already taken.
    pub fn register(&mut self, descriptor: CommandDescriptor, executor: CommandExecutor) -> Result<&mut Self, Error> {
        if descriptor.execution_kind != executor.kind() {
            return Err(Error::Registry(format!(
                "Command '{}' declares {:?} but was given a {:?} executor",
                descriptor.name,
                descriptor.execution_kind,
                executor.kind()
            )));
        }

        let mut keys: Vec<String> = Vec::new();
        for raw in descriptor.all_names() {
            let key = (self.normalizer)(raw);
            if key.is_empty() {
                return Err(Error::Registry(format!("Command '{}' has an empty alias", descriptor.name)));
            }
            if let Some(existing) = self.by_alias.get(&key) {
                return Err(Error::DuplicateAlias {
                    alias: key,
                    existing: existing.descriptor.name.clone(),
                    rejected: descriptor.name.clone(),
                });
            }
            if !keys.contains(&key) {
                keys.push(key);
            }
        }

        let entry = Arc::new(RegisteredCommand {
            descriptor: Arc::new(descriptor),
            executor,
        });
        for key in keys {
            debug!("alias '{}' -> '{}'", key, entry.descriptor.name);
            self.by_alias.insert(key, entry.clone());
        }
        self.commands.push(entry);
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    fn finish(self) -> AliasTable {
        AliasTable {
            by_alias: self.by_alias,
            commands: self.commands,
        }
    }
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

struct AliasTable {
    by_alias: HashMap<String, Arc<RegisteredCommand>>,
    commands: Vec<Arc<RegisteredCommand>>,
}

type Catalog = Box<dyn Fn(&mut RegistryBuilder) -> Result<(), Error> + Send + Sync>;

fn prebuilt_catalog(_: &mut RegistryBuilder) -> Result<(), Error> {
    Ok(())
}

/// Alias -> command lookup, built once on first use and read-only afterwards.
pub struct CommandRegistry {
    normalizer: AliasNormalizer,
    catalog: Catalog,
    table: OnceCell<AliasTable>,
}

impl CommandRegistry {
    /// `catalog` registers every command. It runs at most once successfully;
    /// concurrent first callers wait for it instead of running it again.
    pub fn new<F>(catalog: F) -> Self
    where
        F: Fn(&mut RegistryBuilder) -> Result<(), Error> + Send + Sync + 'static,
    {
        Self {
            normalizer: default_alias_normalizer,
            catalog: Box::new(catalog),
            table: OnceCell::new(),
        }
    }

    pub fn with_normalizer(mut self, normalizer: AliasNormalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    /// Wraps an already-populated builder.
    pub fn from_builder(builder: RegistryBuilder) -> Self {
        let normalizer = builder.normalizer;
        Self {
            normalizer,
            catalog: Box::new(prebuilt_catalog),
            table: OnceCell::with_value(builder.finish()),
        }
    }

    fn table(&self) -> Result<&AliasTable, Error> {
        self.table.get_or_try_init(|| {
            let mut builder = RegistryBuilder::with_normalizer(self.normalizer);
            (self.catalog)(&mut builder)?;
            info!(
                "Command registry built: {} commands, {} aliases",
                builder.commands.len(),
                builder.by_alias.len()
            );
            Ok(builder.finish())
        })
    }

    /// Builds the table now so registration errors surface at startup.
    pub fn ensure_built(&self) -> Result<(), Error> {
        self.table().map(|_| ())
    }

    pub fn is_built(&self) -> bool {
        self.table.get().is_some()
    }

    pub fn normalize(&self, name: &str) -> String {
        (self.normalizer)(name)
    }

    /// `Ok(None)` is the ordinary "no such command" answer.
    pub fn resolve(&self, alias_or_name: &str) -> Result<Option<Arc<RegisteredCommand>>, Error> {
        let key = self.normalize(alias_or_name);
        Ok(self.table()?.by_alias.get(&key).cloned())
    }

    pub fn descriptors(&self) -> Result<Vec<Arc<CommandDescriptor>>, Error> {
        Ok(self.table()?.commands.iter().map(|c| c.descriptor.clone()).collect())
    }
}
