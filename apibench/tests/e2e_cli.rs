#![allow(clippy::unwrap_used)]

use apibench_testserver::{GrpcTestServer, HttpTestServer};

#[tokio::test(flavor = "multi_thread")]
async fn cli_run_persists_one_csv_per_protocol() {
    let http = HttpTestServer::start().await.unwrap();
    let grpc = GrpcTestServer::start().await.unwrap();

    let dir = tempfile::tempdir().unwrap();
    let out_dir = dir.path().to_path_buf();

    let base = http.base_url().to_string();
    let grpc_target = grpc.target();
    let output = tokio::task::spawn_blocking(move || {
        std::process::Command::new(env!("CARGO_BIN_EXE_apibench"))
            .arg("run")
            .args(["--rest", &base])
            .args(["--soap", &base])
            .args(["--graphql", &base])
            .args(["--grpc", &grpc_target])
            .args(["--users", "2"])
            .args(["--duration", "300ms"])
            .args(["--min-wait", "1ms"])
            .args(["--max-wait", "5ms"])
            .args(["--seed", "3"])
            .arg("--out")
            .arg(&out_dir)
            .output()
    })
    .await
    .unwrap()
    .unwrap();

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(output.status.success(), "stderr: {stderr}");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("summary"), "stdout: {stdout}");
    assert!(stdout.contains("Aggregated"));

    let mut names: Vec<String> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    assert_eq!(
        names,
        vec!["graphql-2.csv", "grpc-2.csv", "rest-2.csv", "soap-2.csv"]
    );

    http.shutdown().await;
    grpc.shutdown().await;
}

#[tokio::test]
async fn cli_rejects_invalid_input_with_exit_code_30() {
    let output = tokio::task::spawn_blocking(|| {
        std::process::Command::new(env!("CARGO_BIN_EXE_apibench"))
            .args(["run", "--users", "0", "--duration", "1s"])
            .output()
    })
    .await
    .unwrap()
    .unwrap();

    assert_eq!(output.status.code(), Some(30));
}
