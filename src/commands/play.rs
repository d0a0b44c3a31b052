//! Play command - runs a supervised session with the terminal front-end

use anyhow::{Context, Result};
use colored::Colorize;
use std::path::Path;
use std::sync::Arc;

use super::common::{load_config, resolve_divisions, resolve_screen};
use crate::catalog::{StreamCatalog, YtDlpCatalog};
use crate::config::{DivisionsStore, TilerConfig};
use crate::models::ScreenSize;
use crate::pipeline::OsLauncher;
use crate::probe::{self, PipelineNames, ProcessOnlyProbe, WindowProbe};
use crate::supervisor::{SessionSupervisor, SupervisorDeps};
use crate::tools::{ToolPaths, DOWNLOADER};
use crate::ui::terminal::{event_channel, spawn_stdin_reader};
use crate::ui::{run_front_end, TerminalObserver, UiEvent};

#[derive(Debug, Clone, Default)]
pub struct PlayOptions {
    pub url: String,
    pub divisions: Option<u32>,
    /// Ask before restarting a lost renderer
    pub confirm: bool,
    pub confirm_timeout: Option<u64>,
    pub screen: Option<ScreenSize>,
    pub no_probe_windows: bool,
}

impl PlayOptions {
    /// Apply flags on top of the file configuration.
    pub fn apply_to(&self, config: &mut TilerConfig) {
        if self.confirm {
            config.playback.auto_restart = false;
        }
        if let Some(secs) = self.confirm_timeout {
            config.playback.confirm_timeout_secs = secs;
        }
        if self.no_probe_windows {
            config.probe.windows = false;
        }
    }
}

pub fn execute(config_path: Option<&Path>, options: PlayOptions) -> Result<()> {
    let mut config = load_config(config_path)?;
    options.apply_to(&mut config);

    let screen = resolve_screen(options.screen, &config)?;
    let store = DivisionsStore::default_location();
    let divisions = resolve_divisions(options.divisions, store.as_ref());
    let tools = ToolPaths::discover(&config.tools);

    let catalog: Arc<dyn StreamCatalog> = match &tools {
        Ok(tools) => Arc::new(YtDlpCatalog::new(&tools.downloader)),
        Err(_) => Arc::new(YtDlpCatalog::new(DOWNLOADER)),
    };
    let probe: Arc<dyn WindowProbe> = match &tools {
        Ok(tools) => probe::for_desktop(config.probe.windows, tools),
        Err(_) => Arc::new(ProcessOnlyProbe::new(PipelineNames::default())),
    };

    let (tx, rx) = event_channel();
    let deps = SupervisorDeps {
        catalog,
        launcher: Arc::new(OsLauncher::new(config.terminate_grace())),
        probe,
        observer: Arc::new(TerminalObserver::new(tx.clone())),
        tools,
        selector: config.selector(),
        user_agent: Some(config.downloader.user_agent.clone()),
        preferences: store,
    };
    let supervisor = SessionSupervisor::new(deps, config.supervisor_config(screen));

    println!(
        "{} Playing {} on a {}x{} grid ({})",
        "→".cyan().bold(),
        options.url.bold(),
        divisions,
        divisions,
        screen
    );

    let handle = supervisor
        .start_session(&options.url, divisions)
        .context("Failed to start playback")?;

    let interrupt_tx = tx.clone();
    ctrlc::set_handler(move || {
        let _ = interrupt_tx.send(UiEvent::Interrupted);
    })
    .context("Failed to install Ctrl-C handler")?;
    spawn_stdin_reader(tx).context("Failed to read from stdin")?;

    println!(
        "{} Type {} to stop, {} for commands",
        "─".dimmed(),
        "q".bold(),
        "help".bold()
    );
    run_front_end(&supervisor, &handle, rx);

    println!("{} Session ended ({})", "✓".green().bold(), handle.state());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::supervisor::RestartPolicy;
    use std::time::Duration;

    #[test]
    fn test_flags_override_config() {
        let mut config = TilerConfig::default();
        let options = PlayOptions {
            url: "https://example.com/v".into(),
            confirm: true,
            confirm_timeout: Some(4),
            no_probe_windows: true,
            ..Default::default()
        };
        options.apply_to(&mut config);

        assert_eq!(
            config.restart_policy(),
            RestartPolicy::Confirm {
                timeout: Duration::from_secs(4)
            }
        );
        assert!(!config.probe.windows);
    }

    #[test]
    fn test_no_flags_keep_config() {
        let mut config = TilerConfig::default();
        PlayOptions::default().apply_to(&mut config);
        assert_eq!(config, TilerConfig::default());
    }
}
