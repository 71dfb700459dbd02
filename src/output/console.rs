//! Console output utilities.

use console::style;

/// Print a warning message.
pub fn print_warning(message: &str) {
    println!("{} {}", style("WARN").yellow().bold(), message);
}

/// Print an error message.
pub fn print_error(message: &str) {
    eprintln!("{} {}", style("ERROR").red().bold(), message);
}

/// Print the application banner.
pub fn print_banner() {
    let banner = r#"
╔═══════════════════════════════════════════════════════╗
║     instafetch                                        ║
║     Account media backup                              ║
╚═══════════════════════════════════════════════════════╝
"#;
    println!("{}", style(banner).cyan());
}

/// Print configuration summary.
pub fn print_config_summary(accounts: &[String], mode: &str, output_dir: &str, workers: usize) {
    let accounts = if accounts.is_empty() {
        "(discovered from output directory)".to_string()
    } else {
        accounts.join(", ")
    };

    println!();
    println!("{}", style("Configuration:").bold());
    println!("  Accounts:  {}", accounts);
    println!("  Mode:      {}", mode);
    println!("  Directory: {}", output_dir);
    println!("  Workers:   {}", workers);
    println!();
}
