use crate::errors::AppResult;
use clap::Args;

#[derive(Args)]
pub struct TemplateCommand {
    /// Block of text to classify against the Template Registry
    text: String,
}

impl TemplateCommand {
    pub fn run(&self) -> AppResult<()> {
        let matched = crate::templates::parse(&self.text);
        println!("matched: {}", matched.matched);
        println!("provider: {:?}", matched.provider);
        println!("amount: {:?}", matched.amount);
        println!("origin: {:?}", matched.origin);
        println!("destination: {:?}", matched.destination);
        Ok(())
    }
}
