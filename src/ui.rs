// Terminal output helpers shared by the commands.

use colored::Colorize;

pub fn print_success(message: &str) {
    println!("{}", format!("✅ {}", message).bright_green().bold());
}

pub fn print_error(message: &str) {
    eprintln!("{}", format!("❌ {}", message).bright_red().bold());
}

pub fn print_info(message: &str) {
    println!("{}", format!("ℹ️  {}", message).bright_cyan());
}

pub fn print_warning(message: &str) {
    println!("{}", format!("⚠️  {}", message).bright_yellow());
}

/// One row of a promotion or diff plan: app name plus an old → new transition.
pub fn print_transition(app: &str, from: &str, to: &str) {
    println!("   {} {} → {}", app.cyan(), from.red(), to.green());
}

/// One row of a skip report with the reason dimmed.
pub fn print_skipped(app: &str, reason: &str) {
    println!("   {} {}", app.cyan(), format!("({})", reason).dimmed());
}
