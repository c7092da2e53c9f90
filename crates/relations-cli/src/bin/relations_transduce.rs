// relations-transduce: Run inputs through a compiled regular relation.
//
// Compiles the expression into a subsequential transducer and prints every
// output paired with each input. Inputs come from the command line or from
// stdin (one per line).
//
// Usage:
//   relations-transduce [-e EXPR | -f FILE] [--state-limit N] [INPUT...]
//
// Options:
//   -e, --expr EXPR        Expression text
//   -f, --file FILE        File containing the expression
//   --state-limit N        Abort if a construction stage exceeds N states
//   -h, --help             Print help

use std::io::{self, BufRead, Write};

use relations_fst::SubsequentialTransducer;

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();

    if relations_cli::wants_help(&args) {
        println!("relations-transduce: Transduce inputs with a regular relation.");
        println!();
        println!("Usage: relations-transduce [-e EXPR | -f FILE] [--state-limit N] [INPUT...]");
        println!();
        println!("If INPUT arguments are given, transduces each one.");
        println!("Otherwise reads inputs from stdin (one per line).");
        println!();
        println!("Options:");
        println!("  -e, --expr EXPR        Expression text");
        println!("  -f, --file FILE        File containing the expression");
        println!("  --state-limit N        Abort if a construction stage exceeds N states");
        println!("  -h, --help             Print this help");
        println!();
        println!("Environment:");
        println!("  {}    Expression file used when neither -e nor -f is given", relations_cli::EXPR_PATH_VAR);
        println!("  {}  Default for --state-limit", relations_cli::STATE_LIMIT_VAR);
        return;
    }

    let options = relations_cli::parse_options(&args).unwrap_or_else(|e| relations_cli::fatal(&e));
    let sfst = relations_cli::load_transducer(&options).unwrap_or_else(|e| relations_cli::fatal(&e));
    log::info!("compiled transducer with {} states", sfst.state_count());

    let stdout = io::stdout();
    let mut out = io::BufWriter::new(stdout.lock());

    if options.rest.is_empty() {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let line = match line {
                Ok(l) => l,
                Err(e) => {
                    eprintln!("error reading stdin: {e}");
                    break;
                }
            };
            // Keep interior spaces; only the line ending is dropped.
            let input = line.trim_end_matches('\r');
            transduce_one(input, &sfst, &mut out);
        }
    } else {
        for input in &options.rest {
            transduce_one(input, &sfst, &mut out);
        }
    }
}

fn transduce_one(input: &str, sfst: &SubsequentialTransducer, out: &mut impl Write) {
    let result = sfst.transduce(input);
    if !result.matched {
        let _ = writeln!(out, "{input}: (no match)");
        return;
    }
    for output in &result.outputs {
        let _ = writeln!(out, "{input}: {output}");
    }
}
