use std::net::SocketAddr;

use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::{Request, Response, Status};
use tonic_health::ServingStatus;
use tonic_health::server::HealthReporter;

use apibench_proto::catalog::{
    Empty, IdRequest, Playlist, PlaylistList, Song, SongList, User, UserList,
};
use apibench_proto::{CatalogService, CatalogServiceServer};

#[derive(Debug, Default)]
struct CatalogSvc;

fn songs() -> Vec<Song> {
    vec![
        Song {
            id: 1,
            title: "Blue Train".to_string(),
            artist: "John Coltrane".to_string(),
        },
        Song {
            id: 2,
            title: "So What".to_string(),
            artist: "Miles Davis".to_string(),
        },
    ]
}

fn playlists() -> Vec<Playlist> {
    vec![
        Playlist {
            id: 1,
            name: "Jazz Classics".to_string(),
        },
        Playlist {
            id: 2,
            name: "Late Night".to_string(),
        },
    ]
}

#[tonic::async_trait]
impl CatalogService for CatalogSvc {
    async fn get_all_users(&self, _request: Request<Empty>) -> Result<Response<UserList>, Status> {
        Ok(Response::new(UserList {
            users: vec![
                User {
                    id: 1,
                    name: "Alice".to_string(),
                    email: "alice@example.com".to_string(),
                },
                User {
                    id: 2,
                    name: "Bob".to_string(),
                    email: "bob@example.com".to_string(),
                },
            ],
        }))
    }

    async fn get_all_songs(&self, _request: Request<Empty>) -> Result<Response<SongList>, Status> {
        Ok(Response::new(SongList { songs: songs() }))
    }

    async fn get_user_playlists(
        &self,
        request: Request<IdRequest>,
    ) -> Result<Response<PlaylistList>, Status> {
        if request.into_inner().id <= 0 {
            return Err(Status::not_found("no such user"));
        }
        Ok(Response::new(PlaylistList {
            playlists: playlists(),
        }))
    }

    async fn get_playlist_songs(
        &self,
        request: Request<IdRequest>,
    ) -> Result<Response<SongList>, Status> {
        if request.into_inner().id <= 0 {
            return Err(Status::not_found("no such playlist"));
        }
        Ok(Response::new(SongList { songs: songs() }))
    }

    async fn get_playlists_by_song(
        &self,
        request: Request<IdRequest>,
    ) -> Result<Response<PlaylistList>, Status> {
        if request.into_inner().id <= 0 {
            return Err(Status::not_found("no such song"));
        }
        Ok(Response::new(PlaylistList {
            playlists: playlists(),
        }))
    }
}

pub struct GrpcTestServer {
    addr: SocketAddr,
    reporter: HealthReporter,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<tokio::task::JoinHandle<()>>,
}

impl GrpcTestServer {
    pub async fn start() -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let (mut reporter, health_service) = tonic_health::server::health_reporter();
        reporter
            .set_service_status("", ServingStatus::Serving)
            .await;

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            let incoming = TcpListenerStream::new(listener);

            let server = tonic::transport::Server::builder()
                .add_service(health_service)
                .add_service(CatalogServiceServer::new(CatalogSvc))
                .serve_with_incoming_shutdown(incoming, async move {
                    let _ = shutdown_rx.await;
                });

            let _ = server.await;
        });

        Ok(Self {
            addr,
            reporter,
            shutdown_tx: Some(shutdown_tx),
            task: Some(task),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn target(&self) -> String {
        format!("{}:{}", self.addr.ip(), self.addr.port())
    }

    /// Flip the advertised health status; the TCP port keeps accepting either way.
    pub async fn set_serving(&self, serving: bool) {
        let status = if serving {
            ServingStatus::Serving
        } else {
            ServingStatus::NotServing
        };
        // HealthReporter shares its state; a clone is enough to update it.
        let mut reporter = self.reporter.clone();
        reporter.set_service_status("", status).await;
    }

    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for GrpcTestServer {
    fn drop(&mut self) {
        if self.shutdown_tx.is_some()
            && let Some(task) = self.task.take()
        {
            task.abort();
        }
    }
}
