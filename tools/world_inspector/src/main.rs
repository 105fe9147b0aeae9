use std::env;
use std::path::Path;

use rustc_hash::FxHashMap;
use voxmere_persist::WorldFile;
use voxmere_shared::block::{register_default_blocks, BlockId};

fn main() {
    let mut args = env::args().skip(1);
    let Some(path) = args.next() else {
        eprintln!("Usage: world_inspector <path/to/world.vxm> [--chunks]");
        std::process::exit(2);
    };
    let list_chunks = match args.next().as_deref() {
        None => false,
        Some("--chunks") => true,
        Some(other) => {
            eprintln!("unknown argument: {other}");
            std::process::exit(2);
        }
    };

    if let Err(err) = run(Path::new(&path), list_chunks) {
        eprintln!("world_inspector error: {err}");
        std::process::exit(1);
    }
}

fn run(path: &Path, list_chunks: bool) -> Result<(), String> {
    let world = WorldFile::read(path)
        .map_err(|err| format!("failed to open {}: {err}", path.display()))?;

    println!("World: {}", path.display());
    println!("Magic: {:?}", WorldFile::MAGIC);
    println!("Dims: {} x {} chunks", world.dims.x, world.dims.z);
    println!("Buffer radius: {}", world.buffer_radius);
    println!("Chunk count: {}", world.chunk_count());

    let mut histogram: FxHashMap<BlockId, usize> = FxHashMap::default();
    for (_, chunk) in &world.chunks {
        for block in chunk.blocks.iter() {
            *histogram.entry(*block).or_insert(0) += 1;
        }
    }
    let mut counts: Vec<(BlockId, usize)> = histogram.into_iter().collect();
    counts.sort_unstable_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

    let registry = register_default_blocks();
    println!("Blocks:");
    for (block, count) in counts {
        let name = if registry.contains(block) {
            registry.get_properties(block).name.as_str()
        } else {
            "<unregistered>"
        };
        println!("  {name:>14} ({:>3}): {count}", block.0);
    }

    if list_chunks {
        for (pos, chunk) in &world.chunks {
            println!(
                "  chunk @ ({}, {}, {}): {} occupied",
                pos.x,
                pos.y,
                pos.z,
                chunk.occupied_count()
            );
        }
    }

    Ok(())
}
