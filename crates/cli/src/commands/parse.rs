use std::process;

use crate::{report_error, OutputFormat};

pub(crate) fn cmd_parse(rule: &str, output: OutputFormat, quiet: bool) {
    let tree = match herald_expr::parse(rule) {
        Ok(t) => t,
        Err(e) => {
            report_error(&format!("error: {}", e), output, quiet);
            process::exit(1);
        }
    };

    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => println!("{}", tree),
        OutputFormat::Json => {
            let json = serde_json::json!({
                "source": rule,
                "tree": tree.to_string(),
                "kind": tree.type_name(),
            });
            println!("{}", json);
        }
    }
}
