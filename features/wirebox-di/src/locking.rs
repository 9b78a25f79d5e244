use crate::{errors::RegistryError, registry::Registry};

/// Locks everything the descriptor at `key` declares as a dependency, transitively
///
/// Only eager or explicitly locked singletons propagate locks. Every dependency in the
/// closure must be registered and must be a singleton; nothing is marked unless the
/// whole closure is valid.
pub(crate) fn propagate_locks(registry: &mut Registry, key: &str) -> Result<(), RegistryError> {
    let Some(descriptor) = registry.get(key) else {
        return Ok(());
    };
    if !descriptor.locks_dependencies() {
        return Ok(());
    }

    let mut chain = vec![descriptor.key.clone()];
    let mut to_lock = Vec::new();
    lock_recurse(
        registry,
        &descriptor.key,
        &descriptor.dependencies,
        &mut chain,
        &mut to_lock,
    )?;

    for dependency in to_lock {
        if let Some(descriptor) = registry.get_mut(&dependency) {
            descriptor.dependency_locked = true;
        }
    }

    Ok(())
}

fn lock_recurse(
    registry: &Registry,
    required_by: &str,
    names: &[String],
    chain: &mut Vec<String>,
    to_lock: &mut Vec<String>,
) -> Result<(), RegistryError> {
    for name in names {
        let matches = registry.matching_name(name);
        if matches.is_empty() {
            return Err(RegistryError::DependencyNotFound {
                dependency: name.clone(),
                required_by: required_by.to_string(),
            });
        }

        for dependency in matches {
            if !dependency.is_singleton() {
                return Err(RegistryError::NonSingletonDependency {
                    key: dependency.key.clone(),
                    required_by: required_by.to_string(),
                });
            }

            // Circular Dependency Check
            if chain.contains(&dependency.key) {
                chain.push(dependency.key.clone()); // Add current so chain is complete
                return Err(RegistryError::CyclicDependencyLock {
                    chain: chain.clone(),
                });
            }

            tracing::debug!("'{}' locks its dependency '{}'", required_by, dependency.key);
            to_lock.push(dependency.key.clone());

            if dependency.dependencies.is_empty() {
                continue;
            }

            chain.push(dependency.key.clone());
            lock_recurse(
                registry,
                &dependency.key,
                &dependency.dependencies,
                chain,
                to_lock,
            )?;
            chain.pop();
        }
    }

    Ok(())
}
