use std::path::Path;

use anyhow::{Context, Result};
use comfy_table::Table;
use hubmap::{
    configuration::MappingConfiguration, memory::InMemoryHub, settings::MappingSettings,
    traits::HubConnector,
};

pub fn open_hub(path: &Path) -> Result<InMemoryHub> {
    InMemoryHub::from_path(path)
        .with_context(|| format!("Failed to read iteration at {}", path.display()))
}

pub fn inspect(iteration: &Path, settings: MappingSettings) -> Result<String> {
    let hub = open_hub(iteration)?;
    let configuration = MappingConfiguration::open(&hub, settings)?;
    let store = configuration.store();

    if store.is_temporary() {
        return Ok(format!("No identifier map `{}`", store.map().name));
    }

    let mut table = Table::new();
    table.set_header(vec!["Variable", "Direction", "Thing", "Class"]);
    for identifier in store.identifiers() {
        for correspondence in store.correspondences_for(identifier) {
            let class = hub
                .get_thing_by_id(correspondence.internal_id, None)
                .map_or_else(|| "(missing)".to_string(), |t| t.class_kind().to_string());
            table.add_row(vec![
                identifier.to_string(),
                format!("{:?}", correspondence.external_identifier.direction),
                correspondence.internal_id.to_string(),
                class,
            ]);
        }
    }

    Ok(format!(
        "Identifier map `{}` of {}, {} correspondences\n{table}",
        store.map().name,
        store.map().external_tool_name,
        store.len()
    ))
}
