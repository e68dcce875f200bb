use std::process::ExitCode;

fn main() -> ExitCode {
    tendero_cli::run()
}
