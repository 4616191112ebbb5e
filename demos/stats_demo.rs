use std::hash::BuildHasherDefault;
use std::hash::DefaultHasher;

use blob_table::HashTable;
use blob_table::bucket_hasher::BuildHasherIndex;
use clap::Parser;

#[derive(Parser, Debug)]
struct Args {
    #[arg(short = 'n', long = "keys", default_value_t = 1000)]
    keys: usize,

    /// Use a deliberately poor hasher (key length modulo capacity)
    #[arg(long = "by-length")]
    by_length: bool,
}

fn fill<H: blob_table::BucketHasher>(table: &mut HashTable<H>, keys: usize) {
    for i in 0..keys {
        let key = format!("key_{i:08X}");
        table.insert(key.as_bytes(), &(i as u64).to_le_bytes());
    }
}

fn report<H>(table: &HashTable<H>) {
    println!("Inserted {} keys into {} buckets", table.len(), table.capacity());
    println!(
        "Final load factor: {:.2}%",
        (table.len() as f64 / table.capacity() as f64) * 100.0
    );

    table.chain_histogram().print();
    table.debug_stats().print();
}

fn main() {
    let args = Args::parse();

    println!("Filling table with {} keys...", args.keys);

    if args.by_length {
        let mut table = HashTable::new(|key: &[u8], capacity: usize| key.len() % capacity);
        fill(&mut table, args.keys);
        report(&table);
    } else {
        let mut table = HashTable::new(BuildHasherIndex::new(
            BuildHasherDefault::<DefaultHasher>::default(),
        ));
        fill(&mut table, args.keys);
        report(&table);
    }
}
