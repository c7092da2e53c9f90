// relations-inspect: Dump every construction stage of an expression.
//
// Prints the position metadata (rules, first and follow sets), the position
// automaton, and the subsequential transducer.
//
// Usage:
//   relations-inspect [-e EXPR | -f FILE] [--state-limit N]

use std::io::{self, Write};

use relations_fst::{Metadata, PositionAutomaton, SubsequentialTransducer};

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();

    if relations_cli::wants_help(&args) {
        println!("relations-inspect: Show the metadata, automaton and transducer of an expression.");
        println!();
        println!("Usage: relations-inspect [-e EXPR | -f FILE] [--state-limit N]");
        println!();
        println!("Options:");
        println!("  -e, --expr EXPR        Expression text");
        println!("  -f, --file FILE        File containing the expression");
        println!("  --state-limit N        Abort if a construction stage exceeds N states");
        println!("  -h, --help             Print this help");
        return;
    }

    let options = relations_cli::parse_options(&args).unwrap_or_else(|e| relations_cli::fatal(&e));
    if let Some(extra) = options.rest.first() {
        relations_cli::fatal(&format!("unexpected argument {extra:?}"));
    }
    let config = options.build_config().unwrap_or_else(|e| relations_cli::fatal(&e));
    let text = options
        .resolve_source()
        .and_then(|source| relations_cli::load_expression(&source))
        .unwrap_or_else(|e| relations_cli::fatal(&e));

    let meta = Metadata::parse(&text).unwrap_or_else(|e| relations_cli::fatal(&e.to_string()));
    let automaton = PositionAutomaton::build(&meta, &config)
        .unwrap_or_else(|e| relations_cli::fatal(&e.to_string()));
    let sfst = SubsequentialTransducer::build(&automaton, &config)
        .unwrap_or_else(|e| relations_cli::fatal(&e.to_string()));

    let stdout = io::stdout();
    let mut out = io::BufWriter::new(stdout.lock());

    let alphabet: Vec<String> = meta.alphabet().iter().map(|rule| rule.to_string()).collect();
    let _ = writeln!(out, "== metadata ({} positions)", meta.position_count());
    let _ = writeln!(out, "alphabet: {}", alphabet.join(" "));
    let _ = write!(out, "{meta}");
    let _ = writeln!(out);
    let _ = writeln!(out, "== position automaton ({} states)", automaton.state_count());
    let _ = write!(out, "{automaton}");
    let _ = writeln!(out);
    let _ = writeln!(out, "== subsequential transducer ({} states)", sfst.state_count());
    let _ = write!(out, "{sfst}");
}
