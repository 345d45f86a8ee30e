//! Application orchestrator: wires the discovery core to the console.

use std::sync::Arc;

use rlgrab_discovery::{
    ActiveScan, DiscoveryCore, EndpointLabel, Host, LogTail, MatchEvent, Settings, SystemHost,
};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::config::{Config, StrategyKind};
use crate::console::{self, Command};

/// Runs the agent until `quit`, end of input or Ctrl-C.
pub async fn run(mut config: Config) -> anyhow::Result<()> {
    let core = build_core(&config, Arc::new(system_host(&config)));

    core.set_on_discovered(Arc::new(|label: &EndpointLabel| {
        println!("+ {label}");
    }));
    core.start().await?;

    println!("{}", console::HELP);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    tracing::info!("stdin closed, shutting down");
                    break;
                };
                let cmd = match console::parse(&line) {
                    Ok(Some(cmd)) => cmd,
                    Ok(None) => continue,
                    Err(e) => {
                        println!("{e}");
                        continue;
                    }
                };

                let outcome = execute(&core, &mut config, cmd).await;
                if !outcome.output.is_empty() {
                    println!("{}", outcome.output);
                }
                if outcome.persist {
                    if let Err(e) = config.save() {
                        tracing::warn!(error = %e, "failed to save configuration");
                    }
                }
                if outcome.quit {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("SIGINT received, shutting down");
                break;
            }
        }
    }

    tracing::info!("stopping discovery...");
    core.stop().await?;
    Ok(())
}

fn system_host(config: &Config) -> SystemHost {
    match &config.log_path {
        Some(path) => SystemHost::new().with_log_path(path.clone()),
        None => SystemHost::new(),
    }
}

/// Builds a stopped core for the configured strategy.
fn build_core(config: &Config, host: Arc<dyn Host>) -> DiscoveryCore {
    let settings = Settings::new(config.poll_interval_ms, config.keep_duplicates);
    let core = match config.strategy {
        StrategyKind::ActiveScan => {
            DiscoveryCore::new(ActiveScan::new(config.executable.clone()), host, settings)
        }
        StrategyKind::LogTail => DiscoveryCore::new(LogTail::new(), host, settings),
    };
    // Apply the strategy's floor to the configured interval.
    core.set_poll_interval_ms(config.poll_interval_ms);
    core
}

/// Result of one console command.
#[derive(Debug, Default)]
struct Outcome {
    output: String,
    /// The configuration changed and should be written back.
    persist: bool,
    quit: bool,
}

impl Outcome {
    fn print(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            ..Self::default()
        }
    }
}

async fn execute(core: &DiscoveryCore, config: &mut Config, cmd: Command) -> Outcome {
    match cmd {
        Command::List => Outcome::print(render_list(core)),
        Command::Select(index) => match core.store().set_selection(Some(index)) {
            Some(selected) => Outcome::print(format!("selected [{selected}]")),
            None => Outcome::print("no endpoints to select"),
        },
        Command::Copy => {
            // Resolves an unset selection to the first entry, as `list` shows it.
            core.view();
            match core.store().selected_address() {
                Some(address) => Outcome::print(address),
                None => Outcome::print("no endpoint selected"),
            }
        }
        Command::Reset => {
            core.reset();
            Outcome::print("list cleared")
        }
        Command::Rescan => match core.request_rescan().await {
            Ok(()) => Outcome::default(),
            Err(e) => Outcome::print(e.to_string()),
        },
        Command::MatchStart => {
            core.on_match_event(MatchEvent::Started);
            Outcome::default()
        }
        Command::MatchEnd => {
            core.on_match_event(MatchEvent::Ended);
            Outcome::default()
        }
        Command::SetPoll(ms) => {
            let stored = core.set_poll_interval_ms(ms);
            config.poll_interval_ms = stored;
            Outcome {
                output: format!("poll interval {stored} ms"),
                persist: true,
                quit: false,
            }
        }
        Command::SetDuplicates(keep) => {
            core.set_keep_duplicates(keep);
            config.keep_duplicates = keep;
            Outcome {
                output: format!("duplicates {}", if keep { "on" } else { "off" }),
                persist: true,
                quit: false,
            }
        }
        Command::Help => Outcome::print(console::HELP),
        Command::Quit => Outcome {
            quit: true,
            ..Outcome::default()
        },
    }
}

fn render_list(core: &DiscoveryCore) -> String {
    let view = core.view();
    if view.labels.is_empty() {
        return "no endpoints discovered".into();
    }
    view.labels
        .iter()
        .enumerate()
        .map(|(i, label)| {
            let marker = if view.selected == Some(i) { '*' } else { ' ' };
            format!("{marker} [{i}] {label}")
        })
        .collect::<Vec<_>>()
        .join("\n")
}
