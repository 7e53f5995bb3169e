pub mod books;

use shelf_db::SharedStore;
use shelf_kernel::{settings::Settings, ModuleRegistry};

/// Register all project-specific modules with the registry
pub fn register_all(registry: &mut ModuleRegistry, store: &SharedStore, settings: &Settings) {
    registry.register(books::create_module(
        store.clone(),
        settings.catalog.clone(),
    ));
}
