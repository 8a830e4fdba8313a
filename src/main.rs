//! Camtrap server entry point.

#![allow(clippy::print_stderr)]

fn main() {
    if let Err(e) = camtrap::run() {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
