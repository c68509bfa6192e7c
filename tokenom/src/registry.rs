use crate::types::TokenDescriptor;
use std::collections::HashMap;
use std::sync::{OnceLock, PoisonError, RwLock};

#[derive(Debug, Clone, Hash, PartialEq, Eq)]
struct DescriptorKey {
    service: String,
    collection: String,
}

static REGISTRY: OnceLock<RwLock<HashMap<DescriptorKey, TokenDescriptor>>> = OnceLock::new();

fn registry() -> &'static RwLock<HashMap<DescriptorKey, TokenDescriptor>> {
    REGISTRY.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Outcome of registering a record type's token settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    New,
    Unchanged,
    /// The type was already registered with a different token length.
    Redefined { previous: usize, current: usize },
}

/// Registers `descriptor`, warning when it redefines an earlier token length.
pub fn register_descriptor(descriptor: &TokenDescriptor) -> Registration {
    let key = DescriptorKey {
        service: descriptor.service.clone(),
        collection: descriptor.collection.clone(),
    };
    let mut reg = registry().write().unwrap_or_else(PoisonError::into_inner);
    let previous = reg.insert(key, descriptor.clone());

    match previous {
        None => Registration::New,
        Some(previous) => {
            let previous = previous.token_config.byte_length().get();
            let current = descriptor.token_config.byte_length().get();
            if previous == current {
                Registration::Unchanged
            } else {
                log::warn!(
                    "redefining token_length for {}:{} from {previous} to {current}",
                    descriptor.service,
                    descriptor.collection
                );
                Registration::Redefined { previous, current }
            }
        }
    }
}

pub fn get_descriptor(service: &str, collection: &str) -> Option<TokenDescriptor> {
    let key = DescriptorKey {
        service: service.to_string(),
        collection: collection.to_string(),
    };
    registry()
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&key)
        .cloned()
}
