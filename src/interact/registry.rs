use std::any::TypeId;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use crate::core::{DispatchError, Result};
use crate::interact::{Delivery, Envelope, InteractInterface};

/// Builds the default interface for a registry, given its registry name
/// and the shared inbound command queue.
pub type InterfaceFactory = dyn Fn(&str, mpsc::UnboundedSender<Envelope>) -> (TypeId, Arc<dyn InteractInterface>)
    + Send
    + Sync;

struct RegistryEntry {
    name: String,
    type_id: TypeId,
    iface: Arc<dyn InteractInterface>,
}

struct Queues {
    command_tx: mpsc::UnboundedSender<Envelope>,
    #[allow(dead_code)]
    result_tx: mpsc::UnboundedSender<Delivery>,
}

/// Directory of named interact interfaces.
///
/// Explicitly constructed and `Arc`-shared (no global state). Queues are
/// attached once via [`add_queues`](Self::add_queues), which also lazily
/// creates the reserved `"default"` entry from the configured factory;
/// every lookup guarantees the default exists first.
pub struct InterfaceRegistry {
    entries: Mutex<Vec<RegistryEntry>>,
    queues: Mutex<Option<Queues>>,
    default_factory: Box<InterfaceFactory>,
}

impl InterfaceRegistry {
    pub fn new(default_factory: Box<InterfaceFactory>) -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            queues: Mutex::new(None),
            default_factory,
        }
    }

    /// Attach the engine queues and materialize the default entry.
    pub fn add_queues(
        &self,
        command_tx: mpsc::UnboundedSender<Envelope>,
        result_tx: mpsc::UnboundedSender<Delivery>,
    ) -> Result<()> {
        {
            let mut queues = self.queues.lock()?;
            *queues = Some(Queues {
                command_tx,
                result_tx,
            });
        }
        self.ensure_default()
    }

    /// Clone of the shared inbound command queue, for building further
    /// interfaces outside the registry.
    pub fn command_queue(&self) -> Result<mpsc::UnboundedSender<Envelope>> {
        let queues = self.queues.lock()?;
        queues
            .as_ref()
            .map(|queues| queues.command_tx.clone())
            .ok_or_else(|| DispatchError::Internal("queues not attached".into()))
    }

    fn ensure_default(&self) -> Result<()> {
        let command_tx = self.command_queue()?;
        let mut entries = self.entries.lock()?;
        if entries.iter().any(|entry| entry.name == "default") {
            return Ok(());
        }
        let (type_id, iface) = (self.default_factory)("default", command_tx);
        entries.push(RegistryEntry {
            name: "default".to_string(),
            type_id,
            iface,
        });
        Ok(())
    }

    /// Store an interface under `name`, or under its type's short name
    /// when no explicit name is given. Registering an existing name
    /// replaces that entry in place.
    pub fn register<T>(&self, iface: Arc<T>, name: Option<&str>) -> Result<()>
    where
        T: InteractInterface + 'static,
    {
        self.ensure_default()?;
        let name = name.map(str::to_string).unwrap_or_else(short_type_name::<T>);
        let entry = RegistryEntry {
            name,
            type_id: TypeId::of::<T>(),
            iface,
        };
        let mut entries = self.entries.lock()?;
        match entries.iter_mut().find(|existing| existing.name == entry.name) {
            Some(existing) => *existing = entry,
            None => entries.push(entry),
        }
        Ok(())
    }

    /// `None` resolves the default entry. An explicit name must match
    /// exactly; an unknown name is a configuration bug and fails loudly.
    pub fn get(&self, name: Option<&str>) -> Result<Arc<dyn InteractInterface>> {
        self.ensure_default()?;
        let entries = self.entries.lock()?;
        let wanted = name.unwrap_or("default");
        entries
            .iter()
            .find(|entry| entry.name == wanted)
            .map(|entry| Arc::clone(&entry.iface))
            .ok_or_else(|| DispatchError::InterfaceNotFound(wanted.to_string()))
    }

    /// First registered instance of `T`, falling back to the default
    /// entry when none exists.
    pub fn get_by_type<T: 'static>(&self) -> Result<Arc<dyn InteractInterface>> {
        self.ensure_default()?;
        let entries = self.entries.lock()?;
        let found = entries
            .iter()
            .find(|entry| entry.type_id == TypeId::of::<T>())
            .or_else(|| entries.iter().find(|entry| entry.name == "default"))
            .map(|entry| Arc::clone(&entry.iface));
        found.ok_or_else(|| DispatchError::Internal("default interface missing".into()))
    }
}

fn short_type_name<T>() -> String {
    std::any::type_name::<T>()
        .rsplit("::")
        .next()
        .unwrap_or("interface")
        .to_string()
}
