pub mod image;
pub mod synth;
pub mod validate;

use colored::Colorize;
use hardway_config::Settings;

/// Settings with the `--workstation` flag applied, if given
pub(crate) fn with_workstation(settings: Settings, workstation: Option<String>) -> Settings {
    match workstation {
        Some(workstation) => Settings {
            workstation: Some(workstation),
            ..settings
        },
        None => settings,
    }
}

/// Print an error summary to stderr and exit non-zero
pub(crate) fn fail(title: &str, error: impl std::fmt::Display) -> ! {
    eprintln!();
    eprintln!("{}", format!("✗ {}", title).red().bold());
    eprintln!("  {}", error);
    std::process::exit(1);
}
