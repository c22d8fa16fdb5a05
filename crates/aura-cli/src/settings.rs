//! `settings` command handlers.

use clap::Subcommand;

use aura_core::Theme;

use crate::App;

#[derive(Debug, Subcommand)]
pub enum SettingsCommands {
    /// Print the persisted settings
    Show,
    /// Set the colour theme (light, dark or system)
    Theme { theme: Theme },
    /// Turn notifications on or off
    Notifications {
        #[arg(action = clap::ArgAction::Set)]
        enabled: bool,
    },
}

pub(crate) fn run(app: &App, command: SettingsCommands) -> anyhow::Result<()> {
    match command {
        SettingsCommands::Show => {}
        SettingsCommands::Theme { theme } => app.store.set_theme(theme)?,
        SettingsCommands::Notifications { enabled } => app.store.set_notifications(enabled)?,
    }

    let settings = app.store.snapshot().settings;
    if app.json {
        return App::print_json(&settings);
    }
    println!("theme:         {}", settings.theme.as_str());
    println!(
        "notifications: {}",
        if settings.notifications { "on" } else { "off" }
    );
    Ok(())
}
