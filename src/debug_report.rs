use skriptum::{EvalResult, LoadDetails, Outcome, ParseError, StatementSummary, Value};
use std::collections::BTreeMap;

mod ansi {
    pub const RESET: &str = "\x1b[0m";
    pub const DIM: &str = "\x1b[2m";
    pub const BOLD: &str = "\x1b[1m";

    pub const RED: &str = "\x1b[31m";
    pub const GREEN: &str = "\x1b[32m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const BLUE: &str = "\x1b[34m";
    pub const CYAN: &str = "\x1b[36m";
    pub const GRAY: &str = "\x1b[90m";

    pub struct Palette {
        enabled: bool,
    }

    impl Palette {
        pub fn new(enabled: bool) -> Self {
            Self { enabled }
        }

        pub fn paint(&self, s: impl AsRef<str>, color: &str) -> String {
            if self.enabled { format!("{}{}{}", color, s.as_ref(), RESET) } else { s.as_ref().to_string() }
        }

        pub fn bold(&self, s: impl AsRef<str>) -> String {
            if self.enabled { format!("{}{}{}", BOLD, s.as_ref(), RESET) } else { s.as_ref().to_string() }
        }

        pub fn dim(&self, s: impl AsRef<str>) -> String {
            if self.enabled { format!("{}{}{}", DIM, s.as_ref(), RESET) } else { s.as_ref().to_string() }
        }
    }
}

pub fn print_load(name: &str, details: &LoadDetails, color: bool) {
    let palette = ansi::Palette::new(color);
    println!("\n{}", palette.bold(palette.paint(format!("⚙  Loaded: {}", name), ansi::CYAN)));

    println!("\n{}", palette.paint("━━━ Triggers ━━━", ansi::GRAY));
    if details.triggers.is_empty() {
        println!("{}", palette.dim("  No triggers"));
    }
    for trigger in &details.triggers {
        println!(
            "  {} {} {}",
            palette.paint(format!("line {}", trigger.line), ansi::GRAY),
            palette.bold(palette.paint(format!("on {}", trigger.header), ansi::BLUE)),
            palette.dim(format!("→ {}", trigger.event)),
        );
        for statement in &trigger.statements {
            print_statement(statement, &palette);
        }
    }

    let m = &details.metrics;
    println!("\n{}", palette.paint("━━━ Loader ━━━", ansi::GRAY));
    println!(
        "  Lines: {}  │  Constructs tried: {}  │  Gated: {}  │  Candidates: {}",
        palette.paint(m.lines.to_string(), ansi::BLUE),
        palette.paint(m.constructs_tried.to_string(), ansi::YELLOW),
        palette.dim(m.patterns_gated.to_string()),
        palette.paint(m.candidates.to_string(), ansi::YELLOW),
    );
    println!(
        "  Recursions: {}  │  Max depth: {}  │  Failures reused: {}  │  Folded: {}",
        palette.paint(m.recursions.to_string(), ansi::YELLOW),
        palette.paint(m.max_depth.to_string(), ansi::YELLOW),
        palette.dim(m.failures_reused.to_string()),
        palette.paint(m.constants.to_string(), ansi::GREEN),
    );

    println!("\n{}", palette.paint("━━━ Timing ━━━", ansi::GRAY));
    println!("  Total: {}", palette.paint(format!("{:?}", m.total), ansi::GREEN));
}

fn print_statement(statement: &StatementSummary, palette: &ansi::Palette) {
    let marker = if statement.constant { palette.paint("◆", ansi::GREEN) } else { palette.dim("◇") };
    println!(
        "    {} {} {}",
        marker,
        palette.paint(format!("{:>3}", statement.line), ansi::GRAY),
        palette.paint(statement.kind.to_string(), ansi::CYAN),
    );
    for line in statement.tree.lines() {
        println!("          {}", palette.dim(line));
    }
}

pub fn print_parse_error(source: &str, err: &ParseError, color: bool) {
    let palette = ansi::Palette::new(color);
    eprintln!("{}", palette.bold(palette.paint(format!("error: {}", err), ansi::RED)));
    if let Some(text) = source.lines().nth(err.line().saturating_sub(1)) {
        eprintln!("  {} {}", palette.paint(format!("{:>4} │", err.line()), ansi::GRAY), text);
    }
}

pub fn print_dispatch(event: &str, outcomes: &[EvalResult<Outcome>], variables: &BTreeMap<String, Vec<Value>>, color: bool) {
    let palette = ansi::Palette::new(color);
    println!("\n{}", palette.paint(format!("━━━ Dispatch: {} ━━━", event), ansi::GRAY));
    if outcomes.is_empty() {
        println!("{}", palette.dim("  No trigger listens for this event"));
    }
    for (idx, outcome) in outcomes.iter().enumerate() {
        let shown = match outcome {
            Ok(Outcome::Completed) => palette.paint("✓ completed", ansi::GREEN),
            Ok(Outcome::Stopped { line }) => palette.paint(format!("■ stopped at line {}", line), ansi::YELLOW),
            Err(err) => palette.paint(format!("✗ {}", err), ansi::RED),
        };
        println!("  {} {}", palette.paint(format!("[{}]", idx), ansi::GRAY), shown);
    }

    println!("\n{}", palette.paint("━━━ Variables ━━━", ansi::GRAY));
    if variables.is_empty() {
        println!("{}", palette.dim("  (none)"));
    }
    for (name, values) in variables {
        let shown: Vec<String> = values.iter().map(|v| v.to_string()).collect();
        println!("  {} {} {}", palette.paint(format!("{{{}}}", name), ansi::BLUE), palette.dim("="), shown.join(", "));
    }
    println!();
}
