//! Collection management: list, rename, update metadata, delete.

use cairndb::prelude::*;
use tracing_subscriber::EnvFilter;

fn print_collections(catalog: &Catalog) {
    println!("{:-<60}", "");
    for info in catalog.list_collections() {
        let description = info.metadata.get_str("description").unwrap_or("-");
        println!("  {:<28} {:>4} records  {}", info.name, info.count, description);
    }
    println!("{:-<60}\n", "");
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("🌟 CairnDB Collection Management\n");

    let catalog = Catalog::in_memory();
    for name in ["travel_policies", "hr_policies", "it_policies"] {
        let collection = catalog.get_or_create_collection(name, CollectionOptions::default())?;
        collection.add(RecordBatch::new(["doc1"]).with_documents([format!("Sample {name}")]))?;
    }

    println!("📚 Collections:");
    print_collections(&catalog);

    println!("✏️  Renaming travel_policies → legacy_travel_policies");
    catalog.modify_collection(
        "travel_policies",
        CollectionUpdate::new().rename("legacy_travel_policies"),
    )?;

    println!("✏️  Adding a description");
    catalog.modify_collection(
        "legacy_travel_policies",
        CollectionUpdate::new().with_metadata(
            Metadata::new().with_field("description", "Archived travel policies from 2024"),
        ),
    )?;
    print_collections(&catalog);

    println!("🗑️  Deleting it_policies");
    catalog.delete_collection("it_policies")?;
    print_collections(&catalog);

    match catalog.get_collection("it_policies") {
        Err(Error::CollectionNotFound(name)) => println!("✅ '{name}' is gone"),
        Err(e) => return Err(e),
        Ok(_) => println!("⚠️  it_policies still exists"),
    }

    Ok(())
}
