use anyhow::Result;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use lotto6_mcp::connection::conn;
use lotto6_mcp::{
    AnalysisUseCase, ContactUseCase, DrawUseCase, MCPHandler, SimulationUseCase, stdio,
};

#[tokio::main]
async fn main() -> Result<()> {
    let config = lotto6::config::load();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    tracing::info!("Let's check some Lotto 6aus49 numbers.");

    let db_conn_arc = Arc::new(conn(&config.database_url)?);

    let handler = MCPHandler::new(
        Arc::new(DrawUseCase::new(Arc::clone(&db_conn_arc))),
        Arc::new(ContactUseCase::new(Arc::clone(&db_conn_arc))),
        Arc::new(SimulationUseCase::new(Arc::clone(&db_conn_arc))),
        Arc::new(AnalysisUseCase::new(Arc::clone(&db_conn_arc))),
    );

    let (reader, writer) = stdio();

    handler.serve(reader, writer).await.inspect_err(|e| {
        tracing::error!("serving error: {:?}", e);
    })?;

    Ok(())
}
