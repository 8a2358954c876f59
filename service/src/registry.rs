//! Service trait and the registry that drives drain phases.

use crate::error::{ServiceError, ServiceResult};

/// A long-lived engine subsystem driven once per frame from the main loop.
///
/// Phases run in a fixed sequence across every registered service:
/// `pre_update` for all, then `update` for all, then `post_update` for all.
/// Services typically drain their command queues during `update`.
pub trait Service {
    /// Work that must happen before any service runs its `update`.
    fn pre_update(&mut self) -> ServiceResult<()>;

    /// The service's main drain phase.
    fn update(&mut self) -> ServiceResult<()>;

    /// Work that must happen after every service has run its `update`.
    fn post_update(&mut self) -> ServiceResult<()>;
}

struct RegistryEntry {
    name: String,
    service: Box<dyn Service>,
}

/// Ordered collection of services sharing one frame loop.
///
/// Services run in import order within every phase. The first failing
/// service aborts the tick; later services do not run their remaining
/// phases that tick.
#[derive(Default)]
pub struct ServiceRegistry {
    entries: Vec<RegistryEntry>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a service to the end of the phase order.
    pub fn import(&mut self, name: impl Into<String>, service: Box<dyn Service>) {
        let name = name.into();
        log::debug!("service '{}' imported at position {}", name, self.entries.len());
        self.entries.push(RegistryEntry { name, service });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Runs one full tick: every phase across every service.
    pub fn update_all(&mut self) -> ServiceResult<()> {
        for entry in &mut self.entries {
            Self::run_phase(&entry.name, "pre_update", entry.service.pre_update())?;
        }
        for entry in &mut self.entries {
            Self::run_phase(&entry.name, "update", entry.service.update())?;
        }
        for entry in &mut self.entries {
            Self::run_phase(&entry.name, "post_update", entry.service.post_update())?;
        }
        Ok(())
    }

    fn run_phase(name: &str, phase: &str, result: ServiceResult<()>) -> ServiceResult<()> {
        if let Err(error) = &result {
            log::error!("service '{}' failed during {}: {}", name, phase, error);
        }
        result
    }
}

#[allow(dead_code)]
fn assert_object_safe(_: &dyn Service) {}
