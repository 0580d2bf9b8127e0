use crate::errors::AppResult;
use clap::Args;

#[derive(Args)]
pub struct NormalizeCommand {
    /// Raw OCR'd numeric token, e.g. "$150 .000" or "2.345.678,90"
    text: String,
}

impl NormalizeCommand {
    pub fn run(&self) -> AppResult<()> {
        match crate::numeric::normalize(&self.text) {
            Some(value) => println!("{value}"),
            None => println!("null"),
        }
        Ok(())
    }
}
