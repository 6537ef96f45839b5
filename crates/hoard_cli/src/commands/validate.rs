//! `hoard validate`: check configuration without touching the network.

use console::style;

pub(crate) fn handle_validate(config: &hoard::Config) -> Result<(), Box<dyn std::error::Error>> {
    if let Err(err) = config.validate() {
        match &err {
            hoard::ConfigError::Invalid(errors) => {
                eprintln!("{}", style("Configuration is invalid:").red().bold());
                for error in &errors.0 {
                    eprintln!("  - {error}");
                }
            }
            other => eprintln!("{} {other}", style("Error:").red().bold()),
        }
        return Err(err.into());
    }

    let sources = hoard::sync::sources(config)?;
    println!("{}", style("Configuration is valid").green().bold());
    println!("  root: {}", config.general.root.display());
    if sources.is_empty() {
        println!("  no providers configured");
    }
    for source in &sources {
        println!("  source: {}", source.name);
    }
    Ok(())
}
