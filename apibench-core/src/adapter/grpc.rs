use std::time::{Duration, Instant};

use prost::Message as _;
use tonic::transport::{Channel, Endpoint};

use apibench_proto::CatalogServiceClient;
use apibench_proto::catalog::{Empty, IdRequest};

use crate::error::Result;
use crate::scheduler::GrpcCall;

use super::Sample;

#[derive(Debug)]
pub struct GrpcAdapter {
    client: CatalogServiceClient<Channel>,
}

impl GrpcAdapter {
    /// Opens the population's channel. Calls multiplex over it; it is
    /// dropped exactly once when the population shuts down.
    pub async fn connect(address: &str, request_timeout: Duration) -> Result<Self> {
        let uri = if address.contains("://") {
            address.to_string()
        } else {
            format!("http://{address}")
        };

        let endpoint = Endpoint::from_shared(uri)?
            .tcp_nodelay(true)
            .connect_timeout(Duration::from_secs(3))
            .timeout(request_timeout);

        let channel = endpoint.connect().await?;

        Ok(Self {
            client: CatalogServiceClient::new(channel),
        })
    }

    pub async fn execute(&self, call: GrpcCall) -> Sample {
        let mut client = self.client.clone();
        let started = Instant::now();

        // Response size mirrors the encoded message length, matching the
        // byte accounting of the HTTP transports.
        let res: std::result::Result<u64, tonic::Status> = match call {
            GrpcCall::GetAllUsers => client
                .get_all_users(Empty {})
                .await
                .map(|r| r.into_inner().encoded_len() as u64),
            GrpcCall::GetAllSongs => client
                .get_all_songs(Empty {})
                .await
                .map(|r| r.into_inner().encoded_len() as u64),
            GrpcCall::GetUserPlaylists { id } => client
                .get_user_playlists(IdRequest { id })
                .await
                .map(|r| r.into_inner().encoded_len() as u64),
            GrpcCall::GetPlaylistSongs { id } => client
                .get_playlist_songs(IdRequest { id })
                .await
                .map(|r| r.into_inner().encoded_len() as u64),
            GrpcCall::GetPlaylistsBySong { id } => client
                .get_playlists_by_song(IdRequest { id })
                .await
                .map(|r| r.into_inner().encoded_len() as u64),
        };
        let elapsed = started.elapsed();

        match res {
            Ok(bytes) => Sample::success(elapsed, bytes),
            // Non-OK status covers both protocol errors and transport
            // problems surfaced by tonic after connect.
            Err(status) => Sample::failure(elapsed, format!("grpc_status:{}", status.code() as i32)),
        }
    }
}
