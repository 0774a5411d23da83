// Tue Jan 13 2026 - Alex

use colored::Colorize;

fn main() {
    if let Err(err) = vtable_baker::ui::cli::run() {
        eprintln!("{} {:#}", "[!]".red(), err);
        std::process::exit(1);
    }
}
