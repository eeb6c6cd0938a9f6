use std::process::ExitCode;

fn main() -> ExitCode {
    event_extract::run()
}
