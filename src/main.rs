#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    trainmate::run().await
}
