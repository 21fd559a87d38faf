/// Generated types and stubs for the shared catalog service.
pub mod catalog {
    tonic::include_proto!("apibench.catalog");
}

pub use catalog::catalog_service_client::CatalogServiceClient;
pub use catalog::catalog_service_server::{CatalogService, CatalogServiceServer};
pub use catalog::{Empty, IdRequest, Playlist, PlaylistList, Song, SongList, User, UserList};
