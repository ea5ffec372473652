pub mod api;

use log::info;
use std::error::Error;
use std::time::Duration;
use tokio::net::TcpListener;

/// Local development backend serving the stream and batch chat routes.
pub struct Server {
    addr: String,
    chunk_delay: Duration,
}

impl Server {
    pub fn new(addr: String, chunk_delay: Duration) -> Self {
        Self { addr, chunk_delay }
    }

    pub async fn run(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        let listener = TcpListener::bind(&self.addr).await?;
        info!("Chat backend listening on: http://{}", listener.local_addr()?);
        axum::serve(listener, api::router(self.chunk_delay)).await?;
        Ok(())
    }
}
