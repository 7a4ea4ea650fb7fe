use std::{error::Error, path::PathBuf};

use clap::Parser;

use crate::read_document;

#[derive(Parser)]
pub struct Stats {
    path: PathBuf,
}

pub fn stats(opts: Stats) -> Result<(), Box<dyn Error>> {
    let document = read_document(&opts.path)?;

    println!(
        "version: {:#x} ({:?})",
        document.version,
        document.format_version()
    );
    println!("settings items: {}", document.settings_b.items.len());
    println!("section 1: {}", document.section1.len());
    println!("section 2: {}", document.section2.len());
    println!("fragment groups: {}", document.fragment_groups.len());
    println!("objects: {}", document.objects.len());
    println!(
        "  with hierarchy: {}",
        document
            .objects
            .iter()
            .filter(|object| object.hierarchy.is_some())
            .count()
    );
    println!(
        "  with collision: {}",
        document
            .objects
            .iter()
            .filter(|object| object.collision_instance.is_some())
            .count()
    );
    println!("hitbox groups: {}", document.hitbox_groups.len());
    println!("collision groups: {}", document.collision_groups.len());
    for group in &document.collision_groups {
        println!("  {}: {} colliders", group.name, group.collider_count());
    }

    Ok(())
}
