//! Colored, indented tree output for a finished run.
//!
//! ```text
//! Setup And Teardown
//!   ✓ Demo test 01
//!   ✓ Demo test 02
//! Test suite not ignored
//!   - Pending Test
//! ```

use crate::runner::{RunConfig, RunReport, Status, Summary};
use crate::suite::{join_path, Node, SuiteNode};
use std::io::{self, Write};

// ============================================================================
// ANSI color helpers
// ============================================================================

/// Whether stdout should get ANSI colors.
pub fn use_color() -> bool {
    // Respect NO_COLOR env var (https://no-color.org/)
    if std::env::var_os("NO_COLOR").is_some() {
        return false;
    }
    io::IsTerminal::is_terminal(&io::stdout())
}

#[derive(Clone, Copy)]
struct Palette {
    enabled: bool,
}

impl Palette {
    fn paint(self, code: &str, s: &str) -> String {
        if self.enabled {
            format!("\x1b[{code}m{s}\x1b[0m")
        } else {
            s.to_string()
        }
    }

    fn green(self, s: &str) -> String {
        self.paint("32", s)
    }

    fn red(self, s: &str) -> String {
        self.paint("31", s)
    }

    fn yellow(self, s: &str) -> String {
        self.paint("33", s)
    }

    fn bold(self, s: &str) -> String {
        self.paint("1", s)
    }

    fn dim(self, s: &str) -> String {
        self.paint("2", s)
    }
}

// ============================================================================
// Report rendering
// ============================================================================

/// Print the report to stdout.
pub fn print_report(report: &RunReport) {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    // Nothing useful to do if stdout is gone.
    let _ = write_report(&mut out, report, use_color());
}

/// Render the tree, the summary line, and the numbered failure list.
pub fn write_report(out: &mut impl Write, report: &RunReport, color: bool) -> io::Result<()> {
    let p = Palette { enabled: color };
    // Open suite headers, identified by position rather than name.
    let mut printed: Vec<usize> = Vec::new();

    writeln!(out)?;
    for result in &report.results {
        let shared = printed
            .iter()
            .zip(&result.scope)
            .take_while(|(a, b)| a == b)
            .count();
        printed.truncate(shared);
        for (suite, &index) in result.suites.iter().zip(&result.scope).skip(shared) {
            writeln!(out, "{}{}", "  ".repeat(printed.len()), p.bold(suite))?;
            printed.push(index);
        }

        let indent = "  ".repeat(printed.len());
        let ms = result.duration.as_millis();
        let time = if ms > 100 {
            format!(" {}", p.dim(&format!("({ms}ms)")))
        } else {
            String::new()
        };
        match result.status {
            Status::Passed => writeln!(out, "{indent}{} {}{time}", p.green("✓"), result.name)?,
            Status::Failed => {
                writeln!(out, "{indent}{} {}{time}", p.red("✗"), p.red(&result.name))?;
                for failure in &result.failures {
                    writeln!(out, "{indent}  {}", p.red(&format!("Error: {}", failure.message())))?;
                }
            }
            Status::Pending => writeln!(out, "{indent}{} {}", p.yellow("-"), p.dim(&result.name))?,
            Status::Skipped => writeln!(out, "{indent}{} {}", p.dim("~"), p.dim(&result.name))?,
        }
    }

    write_summary(out, report, p)
}

fn write_summary(out: &mut impl Write, report: &RunReport, p: Palette) -> io::Result<()> {
    let Summary {
        passed,
        failed,
        pending,
        skipped,
    } = report.summary();
    let elapsed = format!("{:.3}s", report.elapsed.as_secs_f64());

    let parts: Vec<String> = [
        (passed > 0).then(|| p.green(&format!("{passed} passed"))),
        (failed > 0).then(|| p.red(&format!("{failed} failed"))),
        (pending > 0).then(|| p.yellow(&format!("{pending} pending"))),
        (skipped > 0).then(|| p.dim(&format!("{skipped} skipped"))),
    ]
    .into_iter()
    .flatten()
    .collect();
    let parts = if parts.is_empty() {
        "no tests".to_string()
    } else {
        parts.join(", ")
    };
    let summary = format!("{parts} ({})", p.dim(&elapsed));

    writeln!(out)?;
    if failed > 0 {
        writeln!(out, "{}", p.red("FAIL"))?;
        writeln!(out, "{summary}")?;
        writeln!(out)?;
        writeln!(out, "Failures:")?;
        for (i, failure) in report.failures().enumerate() {
            writeln!(out, "  {}. {}", i + 1, failure)?;
        }
        writeln!(out)
    } else {
        writeln!(out, "{}", p.green("PASS"))?;
        writeln!(out, "{summary}")
    }
}

// ============================================================================
// Listing
// ============================================================================

/// Print the path of every test the config selects, without running.
pub fn print_list(roots: &[SuiteNode], config: &RunConfig) {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let _ = write_list(&mut out, roots, config);
}

pub fn write_list(out: &mut impl Write, roots: &[SuiteNode], config: &RunConfig) -> io::Result<()> {
    for root in roots {
        list_suite(out, root, &mut Vec::new(), false, config)?;
    }
    Ok(())
}

fn list_suite<'a>(
    out: &mut impl Write,
    suite: &'a SuiteNode,
    path: &mut Vec<&'a str>,
    skipped: bool,
    config: &RunConfig,
) -> io::Result<()> {
    let skipped = skipped || suite.is_skipped();
    path.push(suite.name());
    for child in suite.children() {
        match child {
            Node::Suite(nested) => list_suite(out, nested, path, skipped, config)?,
            Node::Test(test) => {
                let full_path = join_path(path.iter().copied().chain([test.name()]));
                if !config.matches(&full_path) {
                    continue;
                }
                if skipped {
                    writeln!(out, "{full_path} (skipped)")?;
                } else if test.is_pending() {
                    writeln!(out, "{full_path} (pending)")?;
                } else {
                    writeln!(out, "{full_path}")?;
                }
            }
        }
    }
    path.pop();
    Ok(())
}
