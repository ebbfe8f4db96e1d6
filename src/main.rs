//! embedgen CLI binary
//!
//! All logic lives in the library; `cli::run()` prints its own errors.

fn main() {
    if let Err(code) = embedgen::cli::run() {
        std::process::exit(code.as_i32());
    }
}
