use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use herald_engine::{Campaign, CampaignScheduler, CampaignSet, EngineConfig, JitTransport, Signal};
use herald_expr::{EventData, InMemoryUserAttributes};

use crate::{report_error, OutputFormat, SignalKind};

pub(crate) struct SelectArgs {
    pub campaigns: PathBuf,
    pub signal: SignalKind,
    pub event: Option<String>,
    pub label: Option<String>,
    pub attrs: Option<String>,
    pub user: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub record: bool,
}

pub(crate) fn cmd_select(args: SelectArgs, output: OutputFormat, quiet: bool) {
    let config = match &args.config {
        Some(path) => EngineConfig::load(path)
            .unwrap_or_else(|e| exit_with(&format!("error: {}", e), output, quiet)),
        None => EngineConfig::default(),
    };

    let set = read_campaigns(&args.campaigns).unwrap_or_else(|msg| exit_with(&msg, output, quiet));
    let user = match &args.user {
        Some(path) => read_user(path).unwrap_or_else(|msg| exit_with(&msg, output, quiet)),
        None => InMemoryUserAttributes::new(),
    };
    let signal = build_signal(&args).unwrap_or_else(|msg| exit_with(&msg, output, quiet));

    let mut scheduler = CampaignScheduler::from_config(&config, Arc::new(user), transport(&config))
        .unwrap_or_else(|e| exit_with(&format!("error: {}", e), output, quiet));

    let runtime = tokio::runtime::Runtime::new()
        .unwrap_or_else(|e| {
            let msg = format!("error: failed to create tokio runtime: {}", e);
            exit_with(&msg, output, quiet)
        });

    let selected: Option<Campaign> = runtime.block_on(async {
        let chosen = match args.signal {
            SignalKind::NewSession => {
                scheduler.set_campaigns(set);
                scheduler.start_session().await
            }
            SignalKind::CampaignsLoaded => scheduler.load_campaigns(set).await,
            SignalKind::CampaignsRefreshed => scheduler.refresh_campaigns(set).await,
            SignalKind::Event | SignalKind::AttributeChanged => {
                scheduler.set_campaigns(set);
                scheduler.process(&signal).await
            }
        };
        chosen.cloned()
    });

    let eligible: Vec<String> = scheduler
        .engine()
        .eligible_campaigns(scheduler.campaigns(), &signal)
        .into_iter()
        .map(|c| c.id.clone())
        .collect();

    let views = match (&selected, args.record) {
        (Some(campaign), true) => match scheduler.record_display(campaign) {
            Ok(count) => Some(count),
            Err(e) => {
                let msg = format!("error: failed to record view: {}", e);
                exit_with(&msg, output, quiet)
            }
        },
        _ => None,
    };

    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => {
            match &selected {
                Some(c) => println!("selected: {} (priority {})", c.id, c.priority),
                None => println!("no campaign selected"),
            }
            if !eligible.is_empty() {
                println!("eligible: {}", eligible.join(", "));
            }
            if let Some(count) = views {
                println!("views: {}", count);
            }
        }
        OutputFormat::Json => {
            let json = serde_json::json!({
                "signal": signal.kind_name(),
                "selected": selected.as_ref().map(|c| c.id.clone()),
                "payload": selected.as_ref().map(|c| c.display_payload.clone()),
                "eligible": eligible,
                "views": views,
            });
            println!("{}", json);
        }
    }
}

fn exit_with(msg: &str, output: OutputFormat, quiet: bool) -> ! {
    report_error(msg, output, quiet);
    process::exit(1);
}

fn read_campaigns(path: &Path) -> Result<CampaignSet, String> {
    let content = std::fs::read_to_string(path)
        .map_err(|_| format!("error: campaigns file not found: {}", path.display()))?;
    CampaignSet::from_json_str(&content).map_err(|e| format!("error: {}: {}", path.display(), e))
}

/// `{"attributes": {"plan": {"kind": "string", "raw": "pro"}}, "tags": {"segments": ["vip"]}}`
fn read_user(path: &Path) -> Result<InMemoryUserAttributes, String> {
    let content = std::fs::read_to_string(path)
        .map_err(|_| format!("error: user file not found: {}", path.display()))?;
    serde_json::from_str(&content)
        .map_err(|e| format!("error: invalid user file {}: {}", path.display(), e))
}

fn build_signal(args: &SelectArgs) -> Result<Signal, String> {
    Ok(match args.signal {
        SignalKind::NewSession => Signal::NewSession,
        SignalKind::CampaignsLoaded => Signal::CampaignsLoaded,
        SignalKind::CampaignsRefreshed => Signal::CampaignsRefreshed,
        SignalKind::AttributeChanged => Signal::AttributeChanged,
        SignalKind::Event => {
            let name = args
                .event
                .as_deref()
                .ok_or_else(|| "error: --event is required when --signal is event".to_string())?;
            let mut data = EventData::new(name);
            data.label = args.label.clone();
            if let Some(raw) = &args.attrs {
                match serde_json::from_str::<serde_json::Value>(raw) {
                    Ok(serde_json::Value::Object(map)) => data.attributes = map,
                    Ok(_) => return Err("error: --attrs must be a JSON object".to_string()),
                    Err(e) => return Err(format!("error: invalid --attrs JSON: {}", e)),
                }
            }
            Signal::Event(data)
        }
    })
}

#[cfg(feature = "http")]
fn transport(config: &EngineConfig) -> Option<Arc<dyn JitTransport>> {
    config
        .http_transport()
        .map(|t| Arc::new(t) as Arc<dyn JitTransport>)
}

#[cfg(not(feature = "http"))]
fn transport(_config: &EngineConfig) -> Option<Arc<dyn JitTransport>> {
    None
}
