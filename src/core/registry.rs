//! # Service registry: named supervisors built from declarations.
//!
//! [`ServiceRegistry`] is an explicit name → [`Supervisor`] map owned by the
//! application. Declarations reference dependencies **by name**, so the builder can
//! validate the whole graph before any supervisor exists.
//!
//! ## Architecture
//! ```text
//! ServiceRegistryBuilder
//!     .service(name, body, options) ...
//!     .build()
//!         ├─► validate names (non-empty, unique)
//!         ├─► resolve depends_on (unknown name → ConfigError)
//!         ├─► depth-first walk (back edge → ConfigError::DependencyCycle)
//!         └─► construct supervisors in dependency order
//! ```
//!
//! ## Rules
//! - Supervisors are created dependencies-first, so every `depends_on` list holds
//!   already-built supervisors.
//! - `start_all` walks dependency order, `stop_all`/`dispose_all` walk it in reverse.
//! - The registry never creates global state; drop it and the supervisors go with it
//!   (unless handles were cloned out).

use std::collections::HashMap;
use std::sync::Arc;

use crate::core::{ServiceManifest, ServiceOptions, ServiceState, ServiceStatus, Supervisor};
use crate::error::{ConfigError, NotReadyError};
use crate::listeners::Listen;
use crate::services::ServiceRef;

struct Declaration {
    name: String,
    service: ServiceRef,
    options: ServiceOptions,
}

/// Builder of a [`ServiceRegistry`].
#[derive(Default)]
pub struct ServiceRegistryBuilder {
    declarations: Vec<Declaration>,
    listeners: Vec<Arc<dyn Listen>>,
}

impl ServiceRegistryBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a service.
    pub fn service(
        mut self,
        name: impl Into<String>,
        service: ServiceRef,
        options: ServiceOptions,
    ) -> Self {
        self.declarations.push(Declaration {
            name: name.into(),
            service,
            options,
        });
        self
    }

    /// Declares every service of `manifest`, taking its body from `bodies`.
    pub fn from_manifest(
        manifest: ServiceManifest,
        mut bodies: HashMap<String, ServiceRef>,
    ) -> Result<Self, ConfigError> {
        let mut builder = Self::new();
        for (name, options) in manifest.services {
            let Some(service) = bodies.remove(&name) else {
                return Err(ConfigError::MissingService { name });
            };
            builder = builder.service(name, service, options);
        }
        Ok(builder)
    }

    /// Registers a listener on every supervisor, before its first evaluation pass.
    pub fn with_listener(mut self, listener: impl Listen) -> Self {
        self.listeners.push(Arc::new(listener));
        self
    }

    /// Validates the declarations and constructs every supervisor.
    pub fn build(self) -> Result<ServiceRegistry, ConfigError> {
        let mut index: HashMap<&str, usize> = HashMap::with_capacity(self.declarations.len());
        for (i, decl) in self.declarations.iter().enumerate() {
            if decl.name.trim().is_empty() {
                return Err(ConfigError::EmptyName);
            }
            if index.insert(decl.name.as_str(), i).is_some() {
                return Err(ConfigError::DuplicateName {
                    name: decl.name.clone(),
                });
            }
        }

        let mut edges: Vec<Vec<usize>> = Vec::with_capacity(self.declarations.len());
        for decl in &self.declarations {
            let mut deps = Vec::with_capacity(decl.options.depends_on.len());
            for dep in &decl.options.depends_on {
                let Some(&j) = index.get(dep.as_str()) else {
                    return Err(ConfigError::UnknownDependency {
                        service: decl.name.clone(),
                        dependency: dep.clone(),
                    });
                };
                if deps.contains(&j) {
                    return Err(ConfigError::DuplicateDependency {
                        service: decl.name.clone(),
                        dependency: dep.clone(),
                    });
                }
                deps.push(j);
            }
            edges.push(deps);
        }

        let names: Vec<&str> = self.declarations.iter().map(|d| d.name.as_str()).collect();
        let order = dependency_order(&names, &edges)?;
        let order_names: Vec<String> = order.iter().map(|&i| names[i].to_string()).collect();

        // Every option is resolved before the first supervisor runs a hook.
        let mut configs = Vec::with_capacity(self.declarations.len());
        for decl in &self.declarations {
            configs.push(Some(decl.options.to_config(&decl.name, Vec::new())?));
        }

        let mut built: Vec<Option<Supervisor>> = vec![None; self.declarations.len()];
        let mut slots: Vec<Option<Declaration>> =
            self.declarations.into_iter().map(Some).collect();
        for &i in &order {
            let (Some(decl), Some(mut cfg)) = (slots[i].take(), configs[i].take()) else {
                continue;
            };
            cfg.depends_on = edges[i].iter().filter_map(|&j| built[j].clone()).collect();
            let sup =
                Supervisor::with_listeners(decl.name, decl.service, cfg, self.listeners.clone())?;
            built[i] = Some(sup);
        }

        let services = built
            .into_iter()
            .flatten()
            .map(|sup| (sup.name().to_string(), sup))
            .collect();
        tracing::debug!(services = order_names.len(), "service registry built");
        Ok(ServiceRegistry {
            services,
            order: order_names,
        })
    }
}

/// Returns indices in dependencies-first order, or the first cycle found.
fn dependency_order(names: &[&str], edges: &[Vec<usize>]) -> Result<Vec<usize>, ConfigError> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        New,
        Active,
        Done,
    }

    let mut marks = vec![Mark::New; names.len()];
    let mut order = Vec::with_capacity(names.len());

    for root in 0..names.len() {
        if marks[root] != Mark::New {
            continue;
        }
        // (node, next edge to explore)
        let mut stack: Vec<(usize, usize)> = vec![(root, 0)];
        marks[root] = Mark::Active;

        while let Some(top) = stack.last_mut() {
            let (node, cursor) = *top;
            if let Some(&next) = edges[node].get(cursor) {
                top.1 += 1;
                match marks[next] {
                    Mark::New => {
                        marks[next] = Mark::Active;
                        stack.push((next, 0));
                    }
                    Mark::Active => {
                        let start = stack.iter().position(|&(n, _)| n == next).unwrap_or(0);
                        let mut path: Vec<String> =
                            stack[start..].iter().map(|&(n, _)| names[n].to_string()).collect();
                        path.push(names[next].to_string());
                        return Err(ConfigError::DependencyCycle { path });
                    }
                    Mark::Done => {}
                }
            } else {
                marks[node] = Mark::Done;
                order.push(node);
                stack.pop();
            }
        }
    }
    Ok(order)
}

/// Explicit map of named supervisors.
pub struct ServiceRegistry {
    services: HashMap<String, Supervisor>,
    order: Vec<String>,
}

impl ServiceRegistry {
    /// Returns a new builder.
    pub fn builder() -> ServiceRegistryBuilder {
        ServiceRegistryBuilder::new()
    }

    /// Returns the supervisor registered under `name`.
    pub fn get(&self, name: &str) -> Option<&Supervisor> {
        self.services.get(name)
    }

    /// Returns sorted list of registered names.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.services.keys().cloned().collect();
        names.sort_unstable();
        names
    }

    /// Names in dependencies-first order.
    pub fn dependency_order(&self) -> &[String] {
        &self.order
    }

    /// Number of registered supervisors.
    pub fn len(&self) -> usize {
        self.services.len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    /// Iterates supervisors in dependencies-first order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Supervisor> {
        self.order.iter().filter_map(|name| self.services.get(name))
    }

    /// Calls `start()` on every supervisor, dependencies first.
    pub fn start_all(&self) {
        self.iter().for_each(Supervisor::start);
    }

    /// Calls `stop()` on every supervisor, dependents first.
    pub fn stop_all(&self) {
        self.iter().rev().for_each(Supervisor::stop);
    }

    /// Calls `dispose()` on every supervisor, dependents first.
    pub fn dispose_all(&self) {
        self.iter().rev().for_each(Supervisor::dispose);
    }

    /// Status of every supervisor, sorted by name.
    pub fn statuses(&self) -> Vec<(String, ServiceStatus)> {
        self.names()
            .into_iter()
            .filter_map(|name| {
                let status = self.services.get(&name)?.status();
                Some((name, status))
            })
            .collect()
    }

    /// Waits until every supervisor is `Ready`.
    ///
    /// Fails with the first supervisor that ends up in a dead end
    /// (`InitializeFailed` or `Disposed`) instead.
    pub async fn wait_all_ready(&self) -> Result<(), NotReadyError> {
        for sup in self.iter() {
            if sup.wait_for(ServiceState::Ready).await != ServiceState::Ready {
                return sup.ensure_ready();
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceRegistry")
            .field("order", &self.order)
            .finish()
    }
}
