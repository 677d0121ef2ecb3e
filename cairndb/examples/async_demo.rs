//! Async API demo using AsyncCollection.
//!
//! Run with: cargo run --example async_demo --features async

#[cfg(feature = "async")]
use cairndb::prelude::*;

#[cfg(feature = "async")]
#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    println!("Async CairnDB Demo\n");

    let temp_dir = std::env::temp_dir().join("cairndb_async_demo");
    let _ = std::fs::remove_dir_all(&temp_dir);

    let catalog = Catalog::open(&temp_dir).expect("Failed to open catalog");
    let notes = catalog
        .get_or_create_collection("notes", CollectionOptions::default())
        .expect("Failed to create collection");
    let collection = AsyncCollection::from_sync(notes);

    println!("Created async collection '{}'\n", collection.name());

    // Add records concurrently
    println!("⏳ Adding 200 notes concurrently...");
    let start = std::time::Instant::now();

    let mut handles = vec![];
    for i in 0..200 {
        let col = collection.clone();
        let handle = tokio::spawn(async move {
            let topic = if i % 2 == 0 { "travel" } else { "expenses" };
            col.add(
                RecordBatch::new([format!("note_{i}")])
                    .with_documents([format!("Note {i} about {topic} policy")])
                    .with_metadatas([Metadata::new().with_field("topic", topic)]),
            )
            .await
        });
        handles.push(handle);
    }

    // Wait for all writes
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    println!("   [OK] Added in {:?}", start.elapsed());
    println!("   Total notes: {}\n", collection.count().await.unwrap());

    println!("Querying...");
    let results = collection
        .query(
            QueryRequest::texts(["travel policy"])
                .with_n_results(5)
                .with_filter(Filter::field("topic").eq("travel")),
        )
        .await
        .unwrap();

    println!("   Top 5 results:");
    for (i, r) in results[0].iter().enumerate() {
        println!("     {}. {} (distance: {:.4})", i + 1, r.id, r.distance);
    }

    collection.checkpoint().await.unwrap();
    let _ = std::fs::remove_dir_all(&temp_dir);

    println!("\nAsync demo complete!");
}

#[cfg(not(feature = "async"))]
fn main() {
    println!("Run with: cargo run --example async_demo --features async");
}
