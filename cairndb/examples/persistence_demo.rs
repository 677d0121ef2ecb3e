//! Persistence demonstration for CairnDB.
//!
//! This example shows how to:
//! 1. Open a catalog under a directory
//! 2. Add records to a collection
//! 3. Drop the catalog (simulating restart)
//! 4. Reopen and verify the data persisted

use cairndb::prelude::*;
use std::fs;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let catalog_path = std::env::temp_dir().join("cairndb_persistence_demo");

    // Clean up any previous run
    let _ = fs::remove_dir_all(&catalog_path);

    println!("🌟 CairnDB Persistence Demo\n");

    // Phase 1: Create collection and add records
    println!("📥 Phase 1: Creating collection and adding records...");
    {
        let catalog = Catalog::open(&catalog_path)?;
        let saved = catalog.get_or_create_collection(
            "saved_policies",
            CollectionOptions::new()
                .with_metadata(Metadata::new().with_field("description", "Persisted policies")),
        )?;

        saved.add(
            RecordBatch::new(["remote_work_01", "expense_policy_01", "pto_policy_01"])
                .with_documents([
                    "Employees may work remotely up to three days per week with manager approval.",
                    "Receipts are required for all expenses over $25.",
                    "Full-time employees accrue 20 days of paid time off per year.",
                ])
                .with_metadatas([
                    Metadata::new().with_field("category", "work_arrangement"),
                    Metadata::new().with_field("category", "finance"),
                    Metadata::new().with_field("category", "time_off"),
                ]),
        )?;

        println!("   ✅ Added {} records", saved.count()?);
        println!("   💾 Closing catalog...");
        catalog.close()?;
        println!("   ✅ Catalog closed\n");

        // Catalog is dropped here, simulating app shutdown
    }

    // Phase 2: Reopen and verify persistence
    println!("🔄 Phase 2: Reopening catalog after 'restart'...");
    {
        let catalog = Catalog::open(&catalog_path)?;
        for info in catalog.list_collections() {
            println!("   • {} ({} records)", info.name, info.count);
        }

        let saved = catalog.get_collection("saved_policies")?;
        println!("\n📊 Persisted records:");
        for record in saved.get(GetRequest::all())? {
            println!(
                "   [{}] {} ({})",
                record.id,
                record.document.as_deref().unwrap_or(""),
                record.metadata.get_str("category").unwrap_or("?")
            );
        }

        println!("\n🔍 How many vacation days do I get?");
        let results = saved.query(
            QueryRequest::texts(["How many vacation days do I get?"]).with_n_results(1),
        )?;
        for hit in &results[0] {
            println!("   → {} (distance: {:.4})", hit.id, hit.distance);
        }

        // Writes after reopen go through the log again.
        saved.upsert(
            RecordBatch::new(["expense_policy_01"])
                .with_documents(["Receipts are required for all expenses over $50."]),
        )?;
        println!("\n   ✅ Updated expense policy; {} records", saved.count()?);
    }

    let _ = fs::remove_dir_all(&catalog_path);
    println!("\n✨ Persistence verified!");
    Ok(())
}
