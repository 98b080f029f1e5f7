use std::io::Write;

/// Operator-facing status line on stdout. Diagnostics go through `tracing`.
pub fn line(message: impl AsRef<str>) {
    let mut stdout = std::io::stdout().lock();
    let _ = writeln!(stdout, "{}", message.as_ref());
}

pub fn blank() {
    line("");
}

pub fn error(message: impl AsRef<str>) {
    let mut stderr = std::io::stderr().lock();
    let _ = writeln!(stderr, "{}", message.as_ref());
}
