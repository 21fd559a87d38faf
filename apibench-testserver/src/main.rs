use apibench_testserver::{GrpcTestServer, HttpTestServer};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let http = HttpTestServer::start().await?;
    let grpc = GrpcTestServer::start().await?;

    println!("http (rest/soap/graphql) listening on {}", http.base_url());
    println!("grpc listening on {}", grpc.target());
    println!("press ctrl-c to stop");

    tokio::signal::ctrl_c().await?;

    http.shutdown().await;
    grpc.shutdown().await;
    Ok(())
}
