/*
 * Responsibility
 * - tokio runtime startup
 * - app::run() call (no logic here)
 */
use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    securecloud_gateway::app::run().await
}
