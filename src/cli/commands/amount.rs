use crate::errors::AppResult;
use clap::Args;

#[derive(Args)]
pub struct FindAmountCommand {
    /// Block of text to search for the most likely monetary amount
    text: String,
}

impl FindAmountCommand {
    pub fn run(&self) -> AppResult<()> {
        match crate::amount::find(&self.text) {
            Some(value) => println!("{value}"),
            None => println!("null"),
        }
        Ok(())
    }
}
