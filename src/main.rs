mod entry;

use std::process::ExitCode;

use webprobe::error::AppResult;

fn main() -> AppResult<ExitCode> {
    entry::run()
}
