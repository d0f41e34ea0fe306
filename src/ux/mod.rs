use colored::Colorize;
use humansize::{format_size, BINARY};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::time::Duration;

use crate::wire::{ChatMessage, PlantRecord, Sender};

pub const EMPTY_GALLERY: &str = "No plants in your gallery yet. Start by identifying some plants!";

/// Lines of description shown per card in the gallery view.
const CARD_DESCRIPTION_LINES: usize = 3;

pub fn show_plant(plant: &PlantRecord) {
    println!("\n{}", plant.name.bold());
    println!("{}", plant.scientific_name.italic().dimmed());
    println!("{}", image_label(plant).dimmed());
    println!("\n{}", plant.description);
    println!("\n{}", "Care Instructions:".bold());
    for c in &plant.care {
        println!("  • {}", c);
    }
    println!();
}

fn image_label(plant: &PlantRecord) -> String {
    match plant.encoded_image() {
        Ok(img) => format!("[{} photo, {}]", img.mime_type, format_size(img.byte_len(), BINARY)),
        Err(_) => "[no photo]".to_string(),
    }
}

pub fn show_gallery(plants: &[PlantRecord]) {
    println!("\n=== {} ===", "Your Plant Gallery".bold());
    if plants.is_empty() {
        println!("{}\n", EMPTY_GALLERY);
        return;
    }
    for (i, p) in plants.iter().enumerate() {
        println!(
            "{}. {}  {}  {}",
            i,
            p.name.green().bold(),
            p.scientific_name.italic(),
            image_label(p).dimmed()
        );
        println!("{}\n", indent(&clamp_lines(&p.description, CARD_DESCRIPTION_LINES), 3));
    }
}

pub fn show_failure(message: &str) {
    eprintln!("{} {}", "error:".red().bold(), message);
}

pub fn show_chat_message(msg: &ChatMessage) {
    match msg.sender {
        Sender::User => println!("{} {}", "you:".green().bold(), msg.text),
        Sender::Bot => println!("{} {}\n", "assistant:".cyan().bold(), msg.text),
    }
}

pub fn chat_banner(greeting: &str) {
    println!("\n=== {} ===", "Plant Assistant".bold());
    println!("{}", greeting.dimmed());
    println!("{}\n", "(type 'exit' or press Ctrl-D to close)".dimmed());
}

pub fn chat_prompt() {
    print!("{} ", ">".green().bold());
    let _ = io::stdout().flush();
}

pub fn spinner(message: &'static str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

pub fn confirm(prompt: &str) -> bool {
    print!("{} [y/N]: ", prompt);
    let _ = io::stdout().flush();
    let mut s = String::new();
    if io::stdin().read_line(&mut s).is_ok() {
        let ans = s.trim().to_lowercase();
        ans == "y" || ans == "yes"
    } else {
        false
    }
}

fn clamp_lines(s: &str, max: usize) -> String {
    let lines: Vec<&str> = s.lines().filter(|l| !l.trim().is_empty()).collect();
    if lines.len() <= max {
        return lines.join("\n");
    }
    let mut out = lines[..max].join("\n");
    out.push_str(" …");
    out
}

fn indent(s: &str, n: usize) -> String {
    let pad = " ".repeat(n);
    s.lines()
        .map(|l| format!("{}{}", pad, l))
        .collect::<Vec<_>>()
        .join("\n")
}
