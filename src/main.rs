use std::{env, process};

use loxide::Loxide;

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();

    let mut loxide = Loxide::new();

    match args.len() {
        n if n > 2 => {
            println!("Usage: loxide [script]");
            process::exit(64);
        }
        2 => loxide.run_file(&args[1]),
        _ => loxide.run_prompt(),
    };
}
