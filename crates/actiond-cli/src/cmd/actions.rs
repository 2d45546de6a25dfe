use crate::output::{print_json, print_table};
use actiond_core::ActionRegistry;

pub fn run(json: bool) -> anyhow::Result<()> {
    let registry = ActionRegistry::with_builtins()?;
    let actions = registry.actions();

    if json {
        let list: Vec<serde_json::Value> = actions
            .iter()
            .map(|a| {
                serde_json::json!({
                    "name": a.name(),
                    "types": a.types(),
                })
            })
            .collect();
        return print_json(&list);
    }

    let rows = actions
        .iter()
        .map(|a| {
            let types = if a.types().is_empty() {
                "-".to_string()
            } else {
                a.types().join(", ")
            };
            vec![a.name().to_string(), types]
        })
        .collect();
    print_table(&["ACTION", "TYPES"], rows);
    Ok(())
}
