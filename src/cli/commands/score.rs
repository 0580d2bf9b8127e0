use crate::errors::AppResult;
use clap::Args;

#[derive(Args)]
pub struct ScoreCommand {
    /// Combined caption + OCR text to score
    text: String,
}

impl ScoreCommand {
    pub fn run(&self) -> AppResult<()> {
        let result = crate::scorer::score(&self.text);
        println!("score: {}", result.score);
        println!("amount: {:?}", result.amount);
        println!("provider: {:?}", result.provider);
        Ok(())
    }
}
