//! `reflexa templates` — List built-in starter prompts.

use reflexa_agent::TEMPLATES;

pub fn run() {
    println!("📋 Built-in templates");
    println!("=====================\n");
    for template in TEMPLATES {
        println!("  {}", template.name);
        println!("    {}\n", template.prompt);
    }
    println!("Use one with: reflexa run --template \"{}\"", TEMPLATES[0].name);
}
