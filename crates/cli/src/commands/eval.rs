use std::collections::BTreeMap;
use std::path::Path;
use std::process;

use herald_expr::Value;

use crate::{report_error, OutputFormat};

pub(crate) fn cmd_eval(rule: &str, vars_path: Option<&Path>, output: OutputFormat, quiet: bool) {
    let mut vars = match vars_path {
        Some(path) => match load_vars(path) {
            Ok(v) => v,
            Err(msg) => {
                report_error(&msg, output, quiet);
                process::exit(1);
            }
        },
        None => BTreeMap::new(),
    };

    let result = match herald_expr::evaluate(rule, &mut vars) {
        Ok(v) => v,
        Err(e) => {
            report_error(&format!("error: {}", e), output, quiet);
            process::exit(1);
        }
    };

    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => println!("{}", result),
        OutputFormat::Json => {
            let json = serde_json::json!({
                "result": result.to_json(),
                "kind": result.type_name(),
            });
            println!("{}", json);
        }
    }
}

/// Reads a JSON object of variable bindings. Values that have no
/// expression counterpart (objects, mixed arrays) are skipped.
fn load_vars(path: &Path) -> Result<BTreeMap<String, Value>, String> {
    let content = std::fs::read_to_string(path)
        .map_err(|_| format!("error: vars file not found: {}", path.display()))?;
    let json: serde_json::Value = serde_json::from_str(&content)
        .map_err(|e| format!("error: invalid JSON in {}: {}", path.display(), e))?;
    let serde_json::Value::Object(map) = json else {
        return Err(format!("error: {} must contain a JSON object", path.display()));
    };

    let mut vars = BTreeMap::new();
    for (name, value) in map {
        match Value::from_json(&value) {
            Some(v) => {
                vars.insert(name, v);
            }
            None => tracing::warn!(variable = %name, "skipping variable with unsupported value"),
        }
    }
    Ok(vars)
}
