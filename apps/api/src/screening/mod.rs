// Screening pipeline: skill extraction, document ingestion, candidate evaluation,
// ranking and the orchestrator that sequences them.
// All scorer calls go through the `Scorer` seam; nothing here talks HTTP directly
// except `handlers`.

pub mod evaluator;
pub mod handlers;
pub mod ingest;
pub mod orchestrator;
pub mod prompts;
pub mod ranking;
pub mod scorer;
pub mod skills;

#[cfg(test)]
pub mod testing;
