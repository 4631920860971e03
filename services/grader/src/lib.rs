mod cli;
mod commands;
mod prompt;
mod render;

use exam_grading::error::AppError;

pub fn run() -> Result<(), AppError> {
    cli::run()
}
