//! List command
//!
//! Usage: ormstudy list

use ormstudy_chapters::Chapter;

/// Print every chapter id with its title
pub fn execute() -> Result<(), Box<dyn std::error::Error>> {
    for chapter in Chapter::all() {
        println!("{}  {}", chapter.id(), chapter.title());
    }
    Ok(())
}
