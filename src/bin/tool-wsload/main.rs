//! Helper tool flooding the backend with concurrent WebSocket clients

#[cfg(feature = "tool-wsload")]
mod wsload;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    #[cfg(feature = "tool-wsload")]
    {
        wsload::run().await?;
    }
    Ok(())
}
