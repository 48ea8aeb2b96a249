use std::error::Error;

use serde::Serialize;
use topicmatch::{
    Allocation, AllocationConfig, EmbeddingConfig, build_provider, suggest_from_files,
};

#[derive(Serialize)]
struct Output {
    suggestion: Allocation,
}

const USAGE: &str = "usage: topicmatch [--stub] <students.json> <supervisors.json>";

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn Error>> {
    let mut args: Vec<String> = std::env::args().skip(1).collect();
    let stub = args.iter().any(|a| a == "--stub");
    args.retain(|a| a != "--stub");
    let [students, supervisors] = args.as_slice() else {
        return Err(USAGE.into());
    };

    let cfg = if stub {
        EmbeddingConfig::stub()
    } else {
        EmbeddingConfig::default()
    };
    let provider = build_provider(&cfg)?;

    let allocation =
        suggest_from_files(provider.as_ref(), students, supervisors, AllocationConfig::default())
            .await?;

    let output = Output {
        suggestion: allocation,
    };
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}
