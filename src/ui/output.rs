// Mon Feb 09 2026 - Alex

use colored::{ColoredString, Colorize};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Console output mirrored into a report file. Status tags are colored on the
/// console and plain in the file; `quiet` silences the console side only.
pub struct DualOutput {
    console: bool,
    file: Option<BufWriter<File>>,
}

impl DualOutput {
    pub fn create(quiet: bool, report: Option<&Path>) -> io::Result<Self> {
        let file = match report {
            Some(path) => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    std::fs::create_dir_all(parent)?;
                }
                Some(BufWriter::new(File::create(path)?))
            }
            None => None,
        };
        Ok(Self { console: !quiet, file })
    }

    pub fn console(quiet: bool) -> Self {
        Self { console: !quiet, file: None }
    }

    pub fn status(&mut self, tag: &str, message: &str) -> io::Result<()> {
        if self.console {
            println!("{} {}", colored_tag(tag), message);
        }
        if let Some(file) = &mut self.file {
            writeln!(file, "[{}] {}", plain_tag(tag), message)?;
        }
        Ok(())
    }
}

impl Write for DualOutput {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.console {
            io::stdout().write_all(buf)?;
        }
        if let Some(file) = &mut self.file {
            file.write_all(buf)?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.console {
            io::stdout().flush()?;
        }
        if let Some(file) = &mut self.file {
            file.flush()?;
        }
        Ok(())
    }
}

impl Drop for DualOutput {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

fn plain_tag(tag: &str) -> &'static str {
    match tag {
        "+" => "+",
        "!" => "!",
        _ => "*",
    }
}

pub fn colored_tag(tag: &str) -> ColoredString {
    match plain_tag(tag) {
        "+" => "[+]".green(),
        "!" => "[!]".red(),
        _ => "[*]".blue(),
    }
}
