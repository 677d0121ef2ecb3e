//! Quick start example for CairnDB.
//!
//! Adds a handful of travel policies to an in-memory collection, queries
//! them by meaning, then updates and deletes records.
//!
//! Run with: RUST_LOG=cairndb_core=debug cargo run --example quickstart

use cairndb::prelude::*;
use tracing_subscriber::EnvFilter;

fn print_hits(hits: &[SearchResult]) {
    println!("{:-<60}", "");
    for (rank, hit) in hits.iter().enumerate() {
        let policy_type = hit.metadata.get_str("policy_type").unwrap_or("unknown");
        println!(
            "  {}. [{}] {} (distance: {:.4})",
            rank + 1,
            hit.id,
            policy_type,
            hit.distance
        );
        if let Some(document) = &hit.document {
            println!("     {document}");
        }
    }
    println!("{:-<60}\n", "");
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("🌟 CairnDB Quick Start Example\n");

    let catalog = Catalog::in_memory();
    let policies = catalog.get_or_create_collection("travel_policies", CollectionOptions::default())?;

    println!("📥 Adding policies...");
    policies.add(
        RecordBatch::new([
            "flight_policy_01",
            "hotel_policy_01",
            "rental_car_policy_01",
            "flight_policy_02",
        ])
        .with_documents([
            "For domestic flights, employees must book economy class tickets. Business class is only permitted for international flights over 8 hours.",
            "Employees can book hotels up to a maximum of $250 per night in major cities. A list of preferred hotel partners is available.",
            "A mid-size sedan is the standard for car rentals. Upgrades require manager approval. Always select the company's insurance option.",
            "All flights, regardless of destination, must be booked through the official company travel portal, 'Concur'.",
        ])
        .with_metadatas([
            Metadata::new().with_field("policy_type", "flights"),
            Metadata::new().with_field("policy_type", "hotels"),
            Metadata::new().with_field("policy_type", "rental_cars"),
            Metadata::new()
                .with_field("policy_type", "flights")
                .with_field("requires_portal", "True"),
        ]),
    )?;
    println!("✅ Collection contains {} records\n", policies.count()?);

    println!("🔍 What is the policy for international flights?\n");
    let results = policies.query(
        QueryRequest::texts(["What is the policy for international flights?"]).with_n_results(2),
    )?;
    print_hits(&results[0]);

    println!("✏️  Upserting the hotel policy and adding a train policy...");
    policies.upsert(
        RecordBatch::new(["hotel_policy_01", "train_policy_01"])
            .with_documents([
                "Employees can book hotels up to a maximum of $300 per night. See the portal for preferred partners.",
                "Train travel is encouraged for trips under 4 hours. Business class is approved for all train journeys.",
            ])
            .with_metadatas([
                Metadata::new()
                    .with_field("policy_type", "hotels")
                    .with_field("max_spend", 300),
                Metadata::new()
                    .with_field("policy_type", "train")
                    .with_field("last_updated", "2025-10-15"),
            ]),
    )?;
    println!("✅ Collection contains {} records\n", policies.count()?);

    println!("🔍 What is the hotel budget? (hotels only)\n");
    let results = policies.query(
        QueryRequest::texts(["What is the hotel budget?"])
            .with_n_results(1)
            .with_filter(Filter::field("policy_type").eq("hotels")),
    )?;
    print_hits(&results[0]);

    let removed = policies.delete(["train_policy_01"])?;
    println!(
        "🗑️  Deleted {} record(s); {} remain\n",
        removed,
        policies.count()?
    );

    println!("👀 Peek:");
    for record in policies.peek(2)? {
        println!("  [{}] {}", record.id, record.document.unwrap_or_default());
    }

    println!("\n✨ Done! CairnDB is working correctly.");
    Ok(())
}
