use std::sync::Arc;

use crate::output::print_json;
use actiond_core::config::Config;
use actiond_core::{
    ActionRegistry, ActionRequest, ActionsEndpoint, ParameterSet, StoreFilterEngine,
};
use serde_json::Value;

/// Run one dispatch in-process. Per-target failures are part of the printed
/// envelope; only a request-level failure makes the command fail.
pub fn run(config: &Config, action: &str, raw_params: &[String], verbose: bool) -> anyhow::Result<()> {
    let params = parse_params(raw_params)?;

    let store = Arc::new(config.object_store());
    let endpoint = ActionsEndpoint::new(
        Arc::new(ActionRegistry::with_builtins()?),
        Arc::new(StoreFilterEngine::new(store)),
    )
    .with_workers(config.dispatch.workers);

    let request = ActionRequest::post(action, params, config.verbose_errors || verbose);
    match endpoint.handle(&request) {
        Ok(envelope) => print_json(&envelope),
        Err(err) => {
            print_json(&err.to_body())?;
            anyhow::bail!("{err}")
        }
    }
}

/// Parse `key=value` pairs. Values that read as JSON keep their type;
/// anything else is a string. A repeated key collects into an array.
pub fn parse_params(raw: &[String]) -> anyhow::Result<ParameterSet> {
    let mut params = ParameterSet::new();
    for pair in raw {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| anyhow::anyhow!("invalid --param '{pair}': expected KEY=VALUE"))?;
        if key.is_empty() {
            anyhow::bail!("invalid --param '{pair}': empty key");
        }
        let value = serde_json::from_str::<Value>(value)
            .unwrap_or_else(|_| Value::String(value.to_string()));

        let merged = match params.get(key).cloned() {
            None => value,
            Some(Value::Array(mut items)) => {
                items.push(value);
                Value::Array(items)
            }
            Some(existing) => Value::Array(vec![existing, value]),
        };
        params.insert(key, merged);
    }
    Ok(params)
}
