use std::sync::Arc;

use anyhow::Result;
use clap::Parser;

use arbordb::common::types::Rid;
use arbordb::index::btree::BPlusTree;
use arbordb::storage::buffer::BufferPoolManager;
use arbordb::MemoryDiskManager;

#[derive(Parser)]
#[command(author, version, about = "arbordb demo - seed a B+ tree and print it")]
struct Cli {
    /// Buffer pool size (number of frames)
    #[arg(short, long, default_value_t = 64)]
    pool_size: usize,

    /// Number of keys to insert
    #[arg(short, long, default_value_t = 24)]
    keys: i32,

    /// Leaf page fanout
    #[arg(long, default_value_t = 4)]
    leaf_max: usize,

    /// Internal page fanout
    #[arg(long, default_value_t = 4)]
    internal_max: usize,
}

fn gcd(a: i32, b: i32) -> i32 {
    if b == 0 {
        a
    } else {
        gcd(b, a % b)
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let buffer_pool = Arc::new(BufferPoolManager::new(
        cli.pool_size,
        Arc::new(MemoryDiskManager::new()),
    ));
    let header_page_id = buffer_pool.new_page();
    let tree = BPlusTree::<i32>::new(
        Arc::clone(&buffer_pool),
        header_page_id,
        cli.leaf_max,
        cli.internal_max,
    );

    // Insert in a scattered order so splits happen all over the key space.
    let mut stride = 7;
    while gcd(stride, cli.keys) != 1 {
        stride += 2;
    }
    println!("inserting {} keys", cli.keys);
    for i in 0..cli.keys {
        let key = (i * stride + 3) % cli.keys;
        tree.insert(key, Rid::new(key, 0));
    }

    println!("\ntree structure:");
    print!("{}", tree.dump());

    let collected: Vec<i32> = tree.begin().map(|(k, _)| k).collect();
    println!("\niteration yields {} keys: {:?}", collected.len(), collected);

    println!("\nbuffer pool metrics:");
    println!("  cache hits:   {}", buffer_pool.cache_hits());
    println!("  cache misses: {}", buffer_pool.cache_misses());
    println!("  disk reads:   {}", buffer_pool.disk_reads());
    println!("  disk writes:  {}", buffer_pool.disk_writes());

    Ok(())
}
