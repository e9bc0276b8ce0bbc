use provider_plugin::serve;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    terraform_provider_pingdom::run(serve, pingdom_provider::provider).await?;
    Ok(())
}
