//! Semantic search with an OpenAI-compatible embeddings API.
//!
//! Requires `OPENAI_API_KEY` (or `CHROMA_OPENAI_API_KEY`) in the environment.
//! Set `OPENAI_BASE_URL` to target a compatible server instead of OpenAI.
//!
//! Run with: cargo run --example openai_embeddings

use std::time::Duration;

use cairndb::prelude::*;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("🌟 CairnDB Provider Embeddings\n");

    let mut provider =
        ProviderConfig::new("text-embedding-3-small").with_timeout(Duration::from_secs(30));
    if let Ok(base_url) = std::env::var("OPENAI_BASE_URL") {
        provider = provider.with_base_url(base_url);
    }

    let catalog = Catalog::in_memory();
    let docs = catalog.get_or_create_collection(
        "openai_policies",
        CollectionOptions::new().with_embedding(EmbeddingConfig::provider(provider)),
    )?;
    println!("📐 Collection dimension: {}\n", docs.dimension());

    let added = docs.add(
        RecordBatch::new(["policy_1", "policy_2", "policy_3"])
            .with_documents([
                "Employees are entitled to 20 days of paid vacation per year.",
                "Remote work is allowed up to three days per week.",
                "All expense reports must be submitted within 30 days.",
            ])
            .with_metadatas([
                Metadata::new().with_field("category", "time_off"),
                Metadata::new().with_field("category", "work_arrangement"),
                Metadata::new().with_field("category", "finance"),
            ]),
    );

    match added {
        Ok(()) => println!("✅ Added {} documents\n", docs.count()?),
        Err(e @ Error::CredentialMissing { .. }) => {
            println!("❌ {e}");
            println!("   export OPENAI_API_KEY=your-key-here");
            return Ok(());
        }
        Err(e) if e.is_retryable() => {
            println!("⚠️  Provider problem, try again later: {e}");
            return Ok(());
        }
        Err(e) => return Err(e),
    }

    for question in [
        "How many vacation days do I get?",
        "Can I work from home?",
        "When are expense reports due?",
    ] {
        println!("🔍 {question}");
        let results = docs.query(QueryRequest::texts([question]).with_n_results(1))?;
        for hit in &results[0] {
            println!(
                "   → [{}] {} (distance: {:.4})",
                hit.id,
                hit.document.as_deref().unwrap_or(""),
                hit.distance
            );
        }
    }

    Ok(())
}
